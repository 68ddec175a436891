use crate::{
    ConnectionPool, PoolError, PoolStatus, ReadFrameError, RpcClientConfig, TcpConnection,
};
use async_trait::async_trait;
use microrpc::frame::{FrameCodec, Response};
use microrpc::serializer::Serializer;
use microrpc_service::CallOptions;
use microrpc_service_caller::{RpcCallerError, RpcServiceCallerInterface};
use std::io;
use std::sync::Arc;

impl From<PoolError> for RpcCallerError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Connect(err) => RpcCallerError::Network(err),
            PoolError::Context(reason) => RpcCallerError::Context(reason),
            PoolError::InvalidConfig(message) => {
                RpcCallerError::Network(io::Error::new(io::ErrorKind::InvalidInput, message))
            }
        }
    }
}

impl From<ReadFrameError> for RpcCallerError {
    fn from(err: ReadFrameError) -> Self {
        match err {
            ReadFrameError::Io(err) => RpcCallerError::Network(err),
            ReadFrameError::Malformed(err) => RpcCallerError::MalformedFrame(err),
        }
    }
}

/// A TCP RPC client that multiplexes calls over a pool of connections, one
/// in-flight request per connection.
///
/// Bind service stubs to it (`UserServiceClient::bind(&client)`) or call
/// [`call_method`](microrpc_service_caller::call_method) directly.
///
/// Every call checks a connection out of the pool, writes one request frame
/// and reads one response frame back. A connection goes back to the pool
/// only after a clean exchange; on any write, read or framing error it is
/// closed, since its stream position can no longer be trusted.
///
/// The client is always handed out as an `Arc` so stubs and spawned calls
/// can share it.
pub struct RpcClient {
    address: String,
    pool: ConnectionPool<TcpConnection>,
    serializer: Arc<dyn Serializer>,
}

impl RpcClient {
    /// Connects to `address` with the default configuration.
    pub async fn new(address: &str) -> Result<Arc<Self>, PoolError> {
        Self::with_config(address, RpcClientConfig::default()).await
    }

    /// Creates the connection pool and dials its initial connections.
    ///
    /// Fails with [`PoolError::InvalidConfig`] for an inconsistent pool
    /// configuration and with [`PoolError::Connect`] if an initial dial fails.
    pub async fn with_config(
        address: &str,
        config: RpcClientConfig,
    ) -> Result<Arc<Self>, PoolError> {
        let pool = ConnectionPool::new(config.pool, {
            let address = address.to_owned();
            let connect_timeout = config.connect_timeout;
            let max_frame_size = config.max_frame_size;
            move || {
                let address = address.clone();
                async move { TcpConnection::connect(&address, connect_timeout, max_frame_size).await }
            }
        })
        .await?;

        tracing::info!("RPC client ready for {}", address);

        Ok(Arc::new(Self {
            address: address.to_owned(),
            pool,
            serializer: config.serializer,
        }))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.pool.status()
    }
}

#[async_trait]
impl RpcServiceCallerInterface for RpcClient {
    fn serializer(&self) -> Arc<dyn Serializer> {
        Arc::clone(&self.serializer)
    }

    async fn round_trip(
        &self,
        options: CallOptions,
        frame: Vec<u8>,
        oneway: bool,
    ) -> Result<Option<Response>, RpcCallerError> {
        // The caller already framed the request; its id is what the
        // response must echo.
        let expected_id = FrameCodec::decode_prologue(&frame)?.request_id;

        let mut conn = self.pool.acquire(&options).await?;

        if let Err(err) = conn.write_frame(&frame).await {
            tracing::debug!("Write to {} failed: {}", conn.peer_addr(), err);
            conn.discard();
            return Err(err.into());
        }

        // Nothing comes back for a one-way request, so the connection is
        // free again as soon as the frame is out.
        if oneway {
            conn.release();
            return Ok(None);
        }

        let response = match conn.read_frame().await {
            Ok(raw) => FrameCodec::decode_response(&raw).map_err(RpcCallerError::from),
            Err(err) => Err(err.into()),
        };

        let response = match response {
            Ok(response) if response.request_id != expected_id => {
                Err(RpcCallerError::MismatchedResponse {
                    expected: expected_id,
                    actual: response.request_id,
                })
            }
            other => other,
        };

        match response {
            Ok(response) if !conn.has_unread_data() => {
                conn.release();
                Ok(Some(response))
            }
            Ok(response) => {
                tracing::warn!(
                    "Unexpected trailing data from {} after response {}",
                    conn.peer_addr(),
                    response.request_id
                );
                conn.discard();
                Ok(Some(response))
            }
            Err(err) => {
                tracing::debug!("Discarding connection to {}: {}", conn.peer_addr(), err);
                conn.discard();
                Err(err)
            }
        }
    }
}
