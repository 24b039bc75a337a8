//! Opening and using a key-authenticated data connection.

use std::net::SocketAddr;
use std::time::Duration;

use queryft_protocol::TransferSession;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::DEFAULT_BUFFER_SIZE;
use crate::error::DataChannelError;
use crate::stream::{ChunkPump, write_key};

/// Derives the data endpoint: the control connection's host with the
/// session's port.
pub fn data_endpoint(control_peer: SocketAddr, port: u16) -> SocketAddr {
    SocketAddr::new(control_peer.ip(), port)
}

/// A single-use, authenticated data connection.
///
/// Created from a consumed [`TransferSession`], used for exactly one
/// [`upload`](Self::upload) or [`download`](Self::download), and closed on
/// every exit path. Cancelling the token passed to [`open`](Self::open)
/// closes the connection from any task.
pub struct DataConnection {
    stream: TcpStream,
    endpoint: SocketAddr,
    server_transfer_id: u32,
    expected: u64,
    buffer_size: usize,
    cancel: CancellationToken,
    progress: Option<mpsc::Sender<u64>>,
}

impl DataConnection {
    /// Dials the data endpoint and performs the key handshake.
    ///
    /// `connect_timeout` bounds the dial only. If writing the key fails the
    /// socket is shut down before the error is returned.
    pub async fn open(
        session: TransferSession,
        control_peer: SocketAddr,
        connect_timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<Self, DataChannelError> {
        if session.key.is_empty() {
            return Err(DataChannelError::InvalidKey("empty key".into()));
        }

        let endpoint = data_endpoint(control_peer, session.port);

        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(DataChannelError::Closed);
            }
            result = tokio::time::timeout(connect_timeout, TcpStream::connect(endpoint)) => {
                match result {
                    Ok(Ok(s)) => s,
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_) => return Err(DataChannelError::Timeout),
                }
            }
        };

        debug!(
            %endpoint,
            server_transfer_id = session.server_transfer_id,
            "data connection established"
        );

        let handshake = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DataChannelError::Closed),
            result = write_key(&mut stream, &session.key) => result,
        };

        if let Err(e) = handshake {
            warn!(%endpoint, error = %e, "key handshake failed");
            let _ = stream.shutdown().await;
            return Err(e);
        }

        info!(
            %endpoint,
            server_transfer_id = session.server_transfer_id,
            remaining = session.remaining(),
            "data connection authenticated"
        );

        Ok(Self {
            stream,
            endpoint,
            server_transfer_id: session.server_transfer_id,
            expected: session.remaining(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            cancel,
            progress: None,
        })
    }

    /// Sets the streaming chunk size.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Sends cumulative byte counts while streaming.
    pub fn with_progress(mut self, progress: mpsc::Sender<u64>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Bytes this connection will carry.
    pub fn expected_bytes(&self) -> u64 {
        self.expected
    }

    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    /// Token that closes this connection when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Streams exactly the session's remaining bytes from `source`, starting
    /// at its current position, then closes the connection.
    pub async fn upload<R: AsyncRead + Unpin>(
        mut self,
        source: &mut R,
    ) -> Result<u64, DataChannelError> {
        let pump = ChunkPump::new(self.buffer_size, &self.cancel)
            .with_progress(self.progress.as_ref());
        let result = pump.send(source, &mut self.stream, self.expected).await;
        self.finish("upload", result).await
    }

    /// Receives the session's remaining bytes into `sink`, then closes the
    /// connection.
    pub async fn download<W: AsyncWrite + Unpin>(
        mut self,
        sink: &mut W,
    ) -> Result<u64, DataChannelError> {
        let pump = ChunkPump::new(self.buffer_size, &self.cancel)
            .with_progress(self.progress.as_ref());
        let result = pump.receive(&mut self.stream, sink, self.expected).await;
        self.finish("download", result).await
    }

    async fn finish(
        mut self,
        direction: &'static str,
        result: Result<u64, DataChannelError>,
    ) -> Result<u64, DataChannelError> {
        let endpoint = self.endpoint;
        let server_transfer_id = self.server_transfer_id;

        match result {
            Ok(bytes) => {
                // After a download the peer has usually closed already.
                if let Err(e) = self.stream.shutdown().await {
                    if direction == "upload" {
                        return Err(e.into());
                    }
                    debug!(%endpoint, error = %e, "shutdown after download failed");
                }
                info!(
                    %endpoint,
                    server_transfer_id,
                    bytes,
                    direction,
                    "data transfer complete"
                );
                Ok(bytes)
            }
            Err(DataChannelError::Closed) => {
                // Dropping the stream closes the socket; no graceful shutdown.
                warn!(
                    %endpoint,
                    server_transfer_id,
                    direction,
                    "data connection closed locally"
                );
                Err(DataChannelError::Closed)
            }
            Err(e) => {
                let _ = self.stream.shutdown().await;
                warn!(
                    %endpoint,
                    server_transfer_id,
                    direction,
                    error = %e,
                    "data transfer failed"
                );
                Err(e)
            }
        }
    }
}
