use bytes::BytesMut;
use microrpc::frame::{FrameDecodeError, FrameStreamDecoder};
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Why a response frame could not be read. Either way the connection is out
/// of step and must be discarded.
#[derive(Debug, Error)]
pub enum ReadFrameError {
    /// The socket failed or the server closed it.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The server sent bytes that are not a valid frame.
    #[error(transparent)]
    Malformed(#[from] FrameDecodeError),
}

/// One TCP connection to the server plus its frame reassembly state.
///
/// Requests on a connection are strictly sequential: one frame written, one
/// frame read back.
pub struct TcpConnection {
    stream: TcpStream,
    peer: SocketAddr,
    decoder: FrameStreamDecoder,
    read_buf: BytesMut,
    pending: VecDeque<Result<Vec<u8>, FrameDecodeError>>,
}

impl TcpConnection {
    /// Dials `address`, failing with [`io::ErrorKind::TimedOut`] if the
    /// connection is not established within `connect_timeout`.
    pub async fn connect(
        address: &str,
        connect_timeout: Duration,
        max_frame_size: usize,
    ) -> io::Result<Self> {
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connecting to {address} timed out after {connect_timeout:?}"),
                )
            })??;

        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;

        tracing::debug!("Connected to {}", peer);

        Ok(Self {
            stream,
            peer,
            decoder: FrameStreamDecoder::with_max_frame_size(max_frame_size),
            read_buf: BytesMut::with_capacity(READ_BUFFER_SIZE),
            pending: VecDeque::new(),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// `true` if bytes beyond the last frame read are buffered. Such a
    /// connection is out of step with the server and must not be reused.
    pub fn has_unread_data(&self) -> bool {
        !self.pending.is_empty() || self.decoder.pending_len() > 0
    }

    pub async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.stream.write_all(frame).await?;
        self.stream.flush().await
    }

    /// Reads until one complete frame is available and returns its bytes.
    pub async fn read_frame(&mut self) -> Result<Vec<u8>, ReadFrameError> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame?);
            }

            self.read_buf.clear();
            if self.stream.read_buf(&mut self.read_buf).await? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("connection to {} closed by server", self.peer),
                )
                .into());
            }

            self.pending.extend(self.decoder.read_bytes(&self.read_buf));
        }
    }
}
