//! Bounded-chunk copying between a local endpoint and the data connection.
//!
//! Every read and write races the cancellation token, so closing the
//! connection from another task unblocks a stalled transfer immediately.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::DataChannelError;

/// Writes the one-time key as the first bytes of the connection.
pub async fn write_key<W: AsyncWrite + Unpin>(
    writer: &mut W,
    key: &str,
) -> Result<(), DataChannelError> {
    writer.write_all(key.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Copies an exact byte count in fixed-size chunks.
pub struct ChunkPump<'a> {
    buffer_size: usize,
    cancel: &'a CancellationToken,
    progress: Option<&'a mpsc::Sender<u64>>,
}

impl<'a> ChunkPump<'a> {
    /// A zero `buffer_size` is clamped to one byte.
    pub fn new(buffer_size: usize, cancel: &'a CancellationToken) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
            cancel,
            progress: None,
        }
    }

    /// Reports cumulative byte counts after each chunk (non-blocking).
    pub fn with_progress(mut self, progress: Option<&'a mpsc::Sender<u64>>) -> Self {
        self.progress = progress;
        self
    }

    /// Sends `len` bytes from a local `source` to the `remote` peer.
    ///
    /// Source exhaustion before `len` bytes is a short transfer.
    pub async fn send<R, W>(
        &self,
        source: &mut R,
        remote: &mut W,
        len: u64,
    ) -> Result<u64, DataChannelError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = self.buffer(len);
        let mut done: u64 = 0;

        while done < len {
            let want = chunk_len(len - done, buf.len());
            let n = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(DataChannelError::Closed),
                r = source.read(&mut buf[..want]) => r.map_err(DataChannelError::Local)?,
            };
            if n == 0 {
                return Err(DataChannelError::ShortTransfer {
                    expected: len,
                    actual: done,
                });
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(DataChannelError::Closed),
                r = remote.write_all(&buf[..n]) => r?,
            }
            done += n as u64;
            self.report(done);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(DataChannelError::Closed),
            r = remote.flush() => r?,
        }
        Ok(done)
    }

    /// Receives `len` bytes from the `remote` peer into a local `sink`.
    ///
    /// The peer closing early is a short transfer.
    pub async fn receive<R, W>(
        &self,
        remote: &mut R,
        sink: &mut W,
        len: u64,
    ) -> Result<u64, DataChannelError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = self.buffer(len);
        let mut done: u64 = 0;

        while done < len {
            let want = chunk_len(len - done, buf.len());
            let n = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(DataChannelError::Closed),
                r = remote.read(&mut buf[..want]) => r?,
            };
            if n == 0 {
                // Keep what arrived; the caller may resume from here.
                sink.flush().await.map_err(DataChannelError::Local)?;
                return Err(DataChannelError::ShortTransfer {
                    expected: len,
                    actual: done,
                });
            }

            sink.write_all(&buf[..n])
                .await
                .map_err(DataChannelError::Local)?;
            done += n as u64;
            self.report(done);
        }

        sink.flush().await.map_err(DataChannelError::Local)?;
        Ok(done)
    }

    fn buffer(&self, len: u64) -> Vec<u8> {
        vec![0u8; chunk_len(len, self.buffer_size).max(1)]
    }

    fn report(&self, done: u64) {
        if let Some(tx) = self.progress {
            let _ = tx.try_send(done);
        }
    }
}

fn chunk_len(remaining: u64, cap: usize) -> usize {
    usize::try_from(remaining).map_or(cap, |r| r.min(cap))
}
