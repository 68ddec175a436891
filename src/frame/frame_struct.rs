use crate::constants::{
    COMPRESSOR_NONE, FRAME_PROLOGUE_SIZE, HEADER_SEGMENT_DELIMITER, META_KEY_VALUE_DELIMITER, PROTOCOL_VERSION,
};
use crate::frame::FrameEncodeError;
use std::collections::BTreeMap;

/// The fixed 15-byte prologue shared by request and response frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePrologue {
    /// Length of the variable header segment that follows the prologue.
    pub header_length: u32,
    /// Length of the payload that follows the header segment.
    pub body_length: u32,
    pub request_id: u32,
    pub version: u8,
    pub compressor: u8,
    pub serializer_code: u8,
}

impl FramePrologue {
    /// Total number of bytes the frame occupies on the wire, prologue included.
    pub fn frame_len(&self) -> usize {
        FRAME_PROLOGUE_SIZE
            .saturating_add(self.header_length as usize)
            .saturating_add(self.body_length as usize)
    }

    /// Converts a segment length to its `u32` length prefix, failing for
    /// segments over 4 GiB instead of truncating.
    pub fn segment_length(len: usize) -> Result<u32, FrameEncodeError> {
        u32::try_from(len).map_err(|_| FrameEncodeError::SegmentTooLarge(len))
    }
}

/// A single RPC invocation as carried on the wire.
///
/// The header and body lengths are never stored; they are derived from the
/// current field values every time the request is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Correlates the response with this request on a connection.
    pub request_id: u32,
    pub version: u8,
    pub compressor: u8,
    /// Identifies the serializer that produced `payload`.
    pub serializer_code: u8,
    pub service_name: String,
    pub method_name: String,
    /// Side-channel key/value pairs (deadline, one-way marker, ...).
    pub meta: BTreeMap<String, String>,
    /// The serialized argument.
    pub payload: Vec<u8>,
}

impl Request {
    pub fn new(
        request_id: u32,
        serializer_code: u8,
        service_name: impl Into<String>,
        method_name: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            request_id,
            version: PROTOCOL_VERSION,
            compressor: COMPRESSOR_NONE,
            serializer_code,
            service_name: service_name.into(),
            method_name: method_name.into(),
            meta: BTreeMap::new(),
            payload,
        }
    }

    /// Length of the variable header segment as it would be encoded.
    pub fn header_length(&self) -> usize {
        let names = self.service_name.len() + 1 + self.method_name.len() + 1;
        let meta: usize = self
            .meta
            .iter()
            .map(|(key, value)| key.len() + 1 + value.len() + 1)
            .sum();
        names + meta
    }

    pub fn body_length(&self) -> usize {
        self.payload.len()
    }

    /// Checks that the names and meta entries can be framed unambiguously.
    ///
    /// Names may not contain `\n`; meta keys and values may contain neither
    /// `\r` nor `\n`.
    pub fn validate(&self) -> Result<(), FrameEncodeError> {
        if self.service_name.as_bytes().contains(&HEADER_SEGMENT_DELIMITER) {
            return Err(FrameEncodeError::InvalidServiceName(self.service_name.clone()));
        }
        if self.method_name.as_bytes().contains(&HEADER_SEGMENT_DELIMITER) {
            return Err(FrameEncodeError::InvalidMethodName(self.method_name.clone()));
        }

        let is_reserved = |b: &u8| *b == HEADER_SEGMENT_DELIMITER || *b == META_KEY_VALUE_DELIMITER;
        for (key, value) in &self.meta {
            if key.as_bytes().iter().any(is_reserved) {
                return Err(FrameEncodeError::InvalidMetaKey(key.clone()));
            }
            if value.as_bytes().iter().any(is_reserved) {
                return Err(FrameEncodeError::InvalidMetaValue {
                    key: key.clone(),
                    value: value.clone(),
                });
            }
        }

        FramePrologue::segment_length(self.header_length())?;
        FramePrologue::segment_length(self.body_length())?;

        Ok(())
    }
}

/// The outcome of a request as carried on the wire.
///
/// At most one of `payload` and `error_message` is non-empty. Both empty is a
/// successful call with no result value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    pub request_id: u32,
    pub version: u8,
    pub compressor: u8,
    pub serializer_code: u8,
    pub payload: Vec<u8>,
    pub error_message: Vec<u8>,
}

impl Response {
    /// Builds an empty response that echoes the request's envelope.
    pub fn for_request(request: &Request) -> Self {
        Self {
            request_id: request.request_id,
            version: request.version,
            compressor: request.compressor,
            serializer_code: request.serializer_code,
            payload: Vec::new(),
            error_message: Vec::new(),
        }
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self.error_message.clear();
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into().into_bytes();
        self.payload.clear();
        self
    }

    pub fn is_error(&self) -> bool {
        !self.error_message.is_empty()
    }

    /// The error message as text. Invalid UTF-8 is replaced rather than rejected.
    pub fn error_text(&self) -> Option<String> {
        if self.error_message.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.error_message).into_owned())
        }
    }
}
