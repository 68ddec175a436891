//! Note: This `RpcServer` does not include authentication, authorization or
//! transport encryption. It is intended for trusted, internal networks. Any
//! code that owns an [`RpcServiceEndpoint`] can act as a server; this one
//! serves it over plain TCP with one task per connection.

use crate::RpcServerConfig;
use bytes::BytesMut;
use microrpc::frame::{FrameCodec, FrameStreamDecoder};
use microrpc_service::{RequestMetadata, RpcResultStatus};
use microrpc_service_endpoint::{
    RpcServiceEndpoint, RpcServiceEndpointError, RpcServiceRegistration,
};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_util::sync::CancellationToken;

/// An RPC server that accepts TCP connections and serves one request at a
/// time on each of them.
///
/// Services are registered up front, before the server is wrapped in an
/// `Arc` and started. Each accepted connection gets its own task, so a slow
/// handler only holds up the connection it arrived on.
///
/// ```ignore
/// let mut server = RpcServer::new();
/// server.register_service(user_service_registration(Arc::new(users))?)?;
/// let (listener, port) = bind_tcp_listener_on_random_port().await?;
/// tokio::spawn(Arc::new(server).serve_with_listener(listener));
/// ```
pub struct RpcServer {
    endpoint: RpcServiceEndpoint,
    config: RpcServerConfig,
}

impl Default for RpcServer {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcServer {
    /// Creates a server with no services and the default configuration.
    pub fn new() -> Self {
        Self::with_config(RpcServerConfig::default())
    }

    pub fn with_config(config: RpcServerConfig) -> Self {
        RpcServer {
            endpoint: RpcServiceEndpoint::new(),
            config,
        }
    }

    /// The dispatch engine requests are routed through.
    pub fn endpoint(&self) -> &RpcServiceEndpoint {
        &self.endpoint
    }

    /// Mutable access for registering services and serializers before the
    /// server starts.
    pub fn endpoint_mut(&mut self) -> &mut RpcServiceEndpoint {
        &mut self.endpoint
    }

    /// Adds a service's dispatch table. Fails if a service with the same
    /// name is already registered.
    pub fn register_service(
        &mut self,
        registration: RpcServiceRegistration,
    ) -> Result<(), RpcServiceEndpointError> {
        self.endpoint.register_service(registration)
    }

    pub fn config(&self) -> &RpcServerConfig {
        &self.config
    }

    /// Binds to an address and starts the RPC server.
    ///
    /// The address can be any type that implements `ToSocketAddrs`, such as
    /// a string "127.0.0.1:8080" or a `SocketAddr`.
    pub async fn serve<A: ToSocketAddrs>(self, addr: A) -> io::Result<SocketAddr> {
        let listener = TcpListener::bind(addr).await?;
        Arc::new(self).serve_with_listener(listener).await
    }

    /// Starts the RPC server on a specific host and port.
    ///
    /// A thin wrapper around [`serve`](Self::serve); `host` may be an IP
    /// address or a hostname.
    pub async fn serve_on(self, host: &str, port: u16) -> io::Result<SocketAddr> {
        self.serve(format!("{host}:{port}")).await
    }

    /// Starts the RPC server with a pre-bound `TcpListener` and runs until
    /// the task is dropped.
    ///
    /// Binding first is how tests and demos serve on an ephemeral port (port
    /// 0) and still learn the address to dial.
    pub async fn serve_with_listener(
        self: Arc<Self>,
        listener: TcpListener,
    ) -> io::Result<SocketAddr> {
        self.serve_with_shutdown(listener, CancellationToken::new())
            .await
    }

    /// Starts the RPC server with a pre-bound `TcpListener` and runs until
    /// `shutdown` is cancelled.
    ///
    /// On shutdown the listener is closed and every connection stops reading
    /// after its in-flight request has been answered.
    pub async fn serve_with_shutdown(
        self: Arc<Self>,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> io::Result<SocketAddr> {
        let address = listener.local_addr()?;
        tracing::info!("Server running on {:?}", address);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Server on {:?} shutting down", address);
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(Arc::clone(&self).handle_connection(
                            stream,
                            peer,
                            shutdown.child_token(),
                        ));
                    }
                    Err(err) => {
                        // Typically resource exhaustion; keep accepting.
                        tracing::warn!("Failed to accept connection on {:?}: {}", address, err);
                    }
                },
            }
        }

        Ok(address)
    }

    /// Runs the read, decode, invoke, encode, write cycle for one connection.
    ///
    /// Any I/O or framing error closes this connection only.
    async fn handle_connection(
        self: Arc<Self>,
        mut stream: TcpStream,
        peer: SocketAddr,
        shutdown: CancellationToken,
    ) {
        tracing::info!("Client connected: {}", peer);

        if let Err(err) = stream.set_nodelay(true) {
            tracing::debug!("Could not set TCP_NODELAY for {}: {}", peer, err);
        }

        // Frames may span reads, and one read may carry several frames.
        let mut decoder = FrameStreamDecoder::with_max_frame_size(self.config.max_frame_size);
        let mut read_buf = BytesMut::with_capacity(self.config.read_buffer_size);

        'connection: loop {
            read_buf.clear();

            let read = tokio::select! {
                _ = shutdown.cancelled() => break,
                read = stream.read_buf(&mut read_buf) => read,
            };

            match read {
                Ok(0) => {
                    tracing::info!("Client {} disconnected.", peer);
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!("Read from {} failed: {}", peer, err);
                    break;
                }
            }

            for frame in decoder.read_bytes(&read_buf) {
                let request = match frame.and_then(|frame| FrameCodec::decode_request(&frame)) {
                    Ok(request) => request,
                    Err(err) => {
                        tracing::warn!("Malformed frame from {}: {}. Closing connection.", peer, err);
                        break 'connection;
                    }
                };

                let request_id = request.request_id;
                let oneway = RequestMetadata::from_meta(&request.meta).oneway;

                tracing::trace!(
                    "Request {} from {}: {}.{}",
                    request_id,
                    peer,
                    request.service_name,
                    request.method_name
                );

                let response = self.endpoint.invoke(request).await;

                // The caller of a one-way request never reads a response.
                if oneway {
                    continue;
                }

                let frame = match FrameCodec::encode_response(&response) {
                    Ok(frame) => frame,
                    Err(err) => {
                        tracing::warn!("Response {} to {} cannot be framed: {}", request_id, peer, err);
                        // Report the failure in place of the oversized result.
                        let fallback = response
                            .with_error(RpcResultStatus::EncodeFailed.message(&err.to_string()));
                        match FrameCodec::encode_response(&fallback) {
                            Ok(frame) => frame,
                            Err(_) => break 'connection,
                        }
                    }
                };

                if let Err(err) = stream.write_all(&frame).await {
                    tracing::warn!("Write of response {} to {} failed: {}", request_id, peer, err);
                    break 'connection;
                }
            }
        }

        tracing::info!("Terminated connection for {}.", peer);
    }
}
