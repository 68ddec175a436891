// Frame prologue layout (all multi-byte fields are big-endian)

/// Byte offset of the `u32` header segment length.
pub const FRAME_HEADER_LENGTH_OFFSET: usize = 0;

/// Byte offset of the `u32` payload length.
pub const FRAME_BODY_LENGTH_OFFSET: usize = 4;

/// Byte offset of the `u32` request correlation ID.
pub const FRAME_REQUEST_ID_OFFSET: usize = 8;

pub const FRAME_VERSION_OFFSET: usize = 12;
pub const FRAME_COMPRESSOR_OFFSET: usize = 13;
pub const FRAME_SERIALIZER_CODE_OFFSET: usize = 14;

/// Size of the fixed prologue. The variable header segment starts here.
pub const FRAME_PROLOGUE_SIZE: usize = 15;

/// Terminates the service name, the method name and every meta entry.
pub const HEADER_SEGMENT_DELIMITER: u8 = b'\n';

/// Separates a meta key from its value.
pub const META_KEY_VALUE_DELIMITER: u8 = b'\r';

/// Version byte stamped on every outbound frame. Reserved; never interpreted.
pub const PROTOCOL_VERSION: u8 = 0;

/// No compression. The compressor byte is carried but not interpreted.
pub const COMPRESSOR_NONE: u8 = 0;

/// Upper bound on a single frame (prologue + header + payload) accepted by
/// the stream decoder. Guards against allocating for corrupt length prefixes.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;
