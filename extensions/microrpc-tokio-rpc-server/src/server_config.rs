use microrpc::constants::DEFAULT_MAX_FRAME_SIZE;

/// Default size of the per-connection socket read buffer.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Tuning knobs for [`RpcServer`](crate::RpcServer).
#[derive(Debug, Clone, Copy)]
pub struct RpcServerConfig {
    /// Largest request frame accepted. A connection announcing a bigger frame
    /// is closed.
    pub max_frame_size: usize,
    pub read_buffer_size: usize,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl RpcServerConfig {
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn with_read_buffer_size(mut self, read_buffer_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size.max(1);
        self
    }
}
