mod frame_codec;
mod frame_error;
mod frame_stream_decoder;
mod frame_struct;

pub use frame_codec::FrameCodec;
pub use frame_error::{FrameDecodeError, FrameEncodeError};
pub use frame_stream_decoder::{FrameDecoderIterator, FrameStreamDecoder};
pub use frame_struct::{FramePrologue, Request, Response};
