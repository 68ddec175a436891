use crate::PoolConfig;
use microrpc::constants::DEFAULT_MAX_FRAME_SIZE;
use microrpc::serializer::{JsonSerializer, Serializer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Settings for [`RpcClient`](crate::RpcClient).
#[derive(Clone)]
pub struct RpcClientConfig {
    pub pool: PoolConfig,
    /// Bound on each TCP dial.
    pub connect_timeout: Duration,
    /// Responses declaring a larger frame close the connection.
    pub max_frame_size: usize,
    /// Encodes arguments and decodes results for every call.
    pub serializer: Arc<dyn Serializer>,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            serializer: Arc::new(JsonSerializer),
        }
    }
}

impl fmt::Debug for RpcClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClientConfig")
            .field("pool", &self.pool)
            .field("connect_timeout", &self.connect_timeout)
            .field("max_frame_size", &self.max_frame_size)
            .field("serializer", &self.serializer.code())
            .finish()
    }
}

impl RpcClientConfig {
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }
}
