use crate::{
    constants::{
        FRAME_BODY_LENGTH_OFFSET, FRAME_COMPRESSOR_OFFSET, FRAME_HEADER_LENGTH_OFFSET,
        FRAME_PROLOGUE_SIZE, FRAME_REQUEST_ID_OFFSET, FRAME_SERIALIZER_CODE_OFFSET,
        FRAME_VERSION_OFFSET, HEADER_SEGMENT_DELIMITER, META_KEY_VALUE_DELIMITER,
    },
    frame::{FrameDecodeError, FrameEncodeError, FramePrologue, Request, Response},
};
use std::collections::BTreeMap;

/// Encodes and decodes request and response frames.
///
/// Layout (big-endian):
///
/// ```text
/// 0..4    header length    bytes in the variable header segment
/// 4..8    body length      bytes in the payload
/// 8..12   request id
/// 12      version
/// 13      compressor
/// 14      serializer code
/// 15..    header segment   request: service '\n' method '\n' [key '\r' value '\n']*
///                          response: the raw error message
/// then    payload
/// ```
///
/// Decoding is total: any byte sequence either decodes or yields a
/// `FrameDecodeError`; it never panics or reads out of bounds.
pub struct FrameCodec;

impl FrameCodec {
    /// Encodes a request after checking its names and meta for reserved
    /// delimiters.
    pub fn encode_request(request: &Request) -> Result<Vec<u8>, FrameEncodeError> {
        request.validate()?;

        let header_length = request.header_length();
        let body_length = request.body_length();

        let mut buf = Vec::with_capacity(FRAME_PROLOGUE_SIZE + header_length + body_length);
        Self::write_prologue(
            &mut buf,
            &FramePrologue {
                header_length: header_length as u32,
                body_length: body_length as u32,
                request_id: request.request_id,
                version: request.version,
                compressor: request.compressor,
                serializer_code: request.serializer_code,
            },
        );

        buf.extend_from_slice(request.service_name.as_bytes());
        buf.push(HEADER_SEGMENT_DELIMITER);
        buf.extend_from_slice(request.method_name.as_bytes());
        buf.push(HEADER_SEGMENT_DELIMITER);
        for (key, value) in &request.meta {
            buf.extend_from_slice(key.as_bytes());
            buf.push(META_KEY_VALUE_DELIMITER);
            buf.extend_from_slice(value.as_bytes());
            buf.push(HEADER_SEGMENT_DELIMITER);
        }
        buf.extend_from_slice(&request.payload);

        Ok(buf)
    }

    /// Decodes a complete request frame. `buf` must hold exactly one frame.
    pub fn decode_request(buf: &[u8]) -> Result<Request, FrameDecodeError> {
        let prologue = Self::decode_prologue(buf)?;
        let (header, payload) = Self::split_segments(buf, &prologue)?;

        // A well-formed segment always ends with the delimiter.
        let Some((&HEADER_SEGMENT_DELIMITER, body)) = header.split_last() else {
            return Err(FrameDecodeError::UnterminatedHeader("header segment"));
        };
        let mut segments = body.split(|b| *b == HEADER_SEGMENT_DELIMITER);

        let service_name = segments
            .next()
            .ok_or(FrameDecodeError::UnterminatedHeader("service name"))?;
        let service_name = std::str::from_utf8(service_name)
            .map_err(|_| FrameDecodeError::InvalidUtf8("service name"))?
            .to_owned();

        let method_name = segments
            .next()
            .ok_or(FrameDecodeError::UnterminatedHeader("method name"))?;
        let method_name = std::str::from_utf8(method_name)
            .map_err(|_| FrameDecodeError::InvalidUtf8("method name"))?
            .to_owned();

        let mut meta = BTreeMap::new();
        for entry in segments {
            let Some(split_at) = entry.iter().position(|b| *b == META_KEY_VALUE_DELIMITER) else {
                return Err(FrameDecodeError::MissingMetaSeparator(
                    String::from_utf8_lossy(entry).into_owned(),
                ));
            };
            let key = std::str::from_utf8(&entry[..split_at])
                .map_err(|_| FrameDecodeError::InvalidUtf8("meta key"))?;
            let value = std::str::from_utf8(&entry[split_at + 1..])
                .map_err(|_| FrameDecodeError::InvalidUtf8("meta value"))?;
            meta.insert(key.to_owned(), value.to_owned());
        }

        Ok(Request {
            request_id: prologue.request_id,
            version: prologue.version,
            compressor: prologue.compressor,
            serializer_code: prologue.serializer_code,
            service_name,
            method_name,
            meta,
            payload: payload.to_vec(),
        })
    }

    /// Encodes a response. If both an error message and a payload are set,
    /// the error wins and the payload is not written.
    ///
    /// Fails with [`FrameEncodeError::SegmentTooLarge`] if either segment does
    /// not fit its `u32` length prefix.
    pub fn encode_response(response: &Response) -> Result<Vec<u8>, FrameEncodeError> {
        let payload: &[u8] = if response.error_message.is_empty() {
            &response.payload
        } else {
            &[]
        };
        let header_length = FramePrologue::segment_length(response.error_message.len())?;
        let body_length = FramePrologue::segment_length(payload.len())?;

        let mut buf =
            Vec::with_capacity(FRAME_PROLOGUE_SIZE + response.error_message.len() + payload.len());
        Self::write_prologue(
            &mut buf,
            &FramePrologue {
                header_length,
                body_length,
                request_id: response.request_id,
                version: response.version,
                compressor: response.compressor,
                serializer_code: response.serializer_code,
            },
        );
        buf.extend_from_slice(&response.error_message);
        buf.extend_from_slice(payload);

        Ok(buf)
    }

    /// Decodes a complete response frame. `buf` must hold exactly one frame.
    pub fn decode_response(buf: &[u8]) -> Result<Response, FrameDecodeError> {
        let prologue = Self::decode_prologue(buf)?;
        let (error_message, payload) = Self::split_segments(buf, &prologue)?;

        if !error_message.is_empty() && !payload.is_empty() {
            return Err(FrameDecodeError::ConflictingResponseBody);
        }

        Ok(Response {
            request_id: prologue.request_id,
            version: prologue.version,
            compressor: prologue.compressor,
            serializer_code: prologue.serializer_code,
            payload: payload.to_vec(),
            error_message: error_message.to_vec(),
        })
    }

    /// Reads the fixed prologue from the start of `buf`.
    ///
    /// Only the first 15 bytes are inspected; the declared segments do not
    /// have to be present yet.
    pub fn decode_prologue(buf: &[u8]) -> Result<FramePrologue, FrameDecodeError> {
        let Some(prologue) = buf.get(..FRAME_PROLOGUE_SIZE) else {
            return Err(FrameDecodeError::IncompleteFrame {
                expected: FRAME_PROLOGUE_SIZE,
                actual: buf.len(),
            });
        };

        let read_u32 = |offset: usize| {
            u32::from_be_bytes([
                prologue[offset],
                prologue[offset + 1],
                prologue[offset + 2],
                prologue[offset + 3],
            ])
        };

        Ok(FramePrologue {
            header_length: read_u32(FRAME_HEADER_LENGTH_OFFSET),
            body_length: read_u32(FRAME_BODY_LENGTH_OFFSET),
            request_id: read_u32(FRAME_REQUEST_ID_OFFSET),
            version: prologue[FRAME_VERSION_OFFSET],
            compressor: prologue[FRAME_COMPRESSOR_OFFSET],
            serializer_code: prologue[FRAME_SERIALIZER_CODE_OFFSET],
        })
    }

    fn write_prologue(buf: &mut Vec<u8>, prologue: &FramePrologue) {
        buf.extend_from_slice(&prologue.header_length.to_be_bytes());
        buf.extend_from_slice(&prologue.body_length.to_be_bytes());
        buf.extend_from_slice(&prologue.request_id.to_be_bytes());
        buf.push(prologue.version);
        buf.push(prologue.compressor);
        buf.push(prologue.serializer_code);
    }

    /// Returns the header segment and payload, checking that `buf` holds
    /// exactly the number of bytes the prologue declares.
    fn split_segments<'a>(
        buf: &'a [u8],
        prologue: &FramePrologue,
    ) -> Result<(&'a [u8], &'a [u8]), FrameDecodeError> {
        let declared = prologue.frame_len();
        if buf.len() < declared {
            return Err(FrameDecodeError::IncompleteFrame {
                expected: declared,
                actual: buf.len(),
            });
        }
        if buf.len() > declared {
            return Err(FrameDecodeError::LengthMismatch {
                declared,
                actual: buf.len(),
            });
        }

        let header_end = FRAME_PROLOGUE_SIZE + prologue.header_length as usize;
        Ok((&buf[FRAME_PROLOGUE_SIZE..header_end], &buf[header_end..]))
    }
}
