use crate::constants::{DEFAULT_MAX_FRAME_SIZE, FRAME_PROLOGUE_SIZE};
use crate::frame::{FrameCodec, FrameDecodeError};
use std::collections::VecDeque;

/// Reassembles whole frames from an arbitrarily chunked byte stream.
///
/// Socket reads rarely line up with frame boundaries: a read may end in the
/// middle of a prologue or carry several frames at once. The decoder buffers
/// partial input and emits the raw bytes of each complete frame, ready for
/// `FrameCodec::decode_request` or `FrameCodec::decode_response`.
///
/// A frame whose declared size exceeds the configured limit is reported as
/// `FrameTooLarge` and poisons the decoder: once the length prefix can no
/// longer be trusted there is no way to find the next frame boundary, so the
/// connection should be closed.
pub struct FrameStreamDecoder {
    buffer: Vec<u8>,
    max_frame_size: usize,
    is_poisoned: bool,
}

pub struct FrameDecoderIterator {
    queue: VecDeque<Result<Vec<u8>, FrameDecodeError>>,
}

impl Iterator for FrameDecoderIterator {
    type Item = Result<Vec<u8>, FrameDecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.pop_front()
    }
}

impl Default for FrameStreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStreamDecoder {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_frame_size,
            is_poisoned: false,
        }
    }

    /// Number of buffered bytes that do not yet form a complete frame.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_poisoned(&self) -> bool {
        self.is_poisoned
    }

    // Reads new bytes and emits every frame they complete
    pub fn read_bytes(&mut self, data: &[u8]) -> FrameDecoderIterator {
        let mut queue = VecDeque::new();

        if self.is_poisoned {
            return FrameDecoderIterator { queue };
        }

        self.buffer.extend_from_slice(data);

        while self.buffer.len() >= FRAME_PROLOGUE_SIZE {
            let prologue = match FrameCodec::decode_prologue(&self.buffer) {
                Ok(prologue) => prologue,
                Err(e) => {
                    queue.push_back(Err(e));
                    break;
                }
            };

            let total = prologue.frame_len();
            if total > self.max_frame_size {
                tracing::warn!(
                    "Rejecting frame of {} bytes (limit {})",
                    total,
                    self.max_frame_size
                );
                self.is_poisoned = true;
                self.buffer.clear();
                queue.push_back(Err(FrameDecodeError::FrameTooLarge {
                    declared: total,
                    limit: self.max_frame_size,
                }));
                break;
            }

            if self.buffer.len() < total {
                break;
            }

            let frame: Vec<u8> = self.buffer.drain(..total).collect();
            queue.push_back(Ok(frame));
        }

        FrameDecoderIterator { queue }
    }
}
