use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerializerError {
    /// A value could not be turned into bytes.
    #[error("encode failed: {0}")]
    Encode(String),

    /// Bytes could not be turned back into a value of the expected shape.
    #[error("decode failed: {0}")]
    Decode(String),
}
