use thiserror::Error;

/// Reasons a request cannot be turned into a well-formed frame.
///
/// These are detected locally, before any byte reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameEncodeError {
    #[error("service name {0:?} contains a newline")]
    InvalidServiceName(String),

    #[error("method name {0:?} contains a newline")]
    InvalidMethodName(String),

    #[error("meta key {0:?} contains a reserved delimiter")]
    InvalidMetaKey(String),

    #[error("meta value {value:?} for key {key:?} contains a reserved delimiter")]
    InvalidMetaValue { key: String, value: String },

    /// A segment longer than a `u32` length prefix can describe.
    #[error("frame segment of {0} bytes exceeds the u32 length prefix")]
    SegmentTooLarge(usize),
}

/// The malformed-frame family: every way a byte sequence can fail to be a
/// valid frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameDecodeError {
    /// Fewer bytes than the prologue, or than the lengths it declares.
    #[error("incomplete frame: need {expected} bytes, have {actual}")]
    IncompleteFrame { expected: usize, actual: usize },

    /// More bytes than the prologue declares.
    #[error("frame length mismatch: declared {declared} bytes, got {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("request header segment is missing the {0} terminator")]
    UnterminatedHeader(&'static str),

    #[error("meta entry {0:?} has no key/value separator")]
    MissingMetaSeparator(String),

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("response carries both an error message and a payload")]
    ConflictingResponseBody,

    #[error("declared frame size {declared} exceeds the limit of {limit} bytes")]
    FrameTooLarge { declared: usize, limit: usize },
}
