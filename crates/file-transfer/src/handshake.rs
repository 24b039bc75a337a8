//! Transfer handshake and session streaming.

use queryft_protocol::{Arg, Command, CommandName, FileLocator, TransferSession};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::FileTransfers;
use crate::error::FileTransferError;

impl FileTransfers<'_> {
    /// Initialises an upload of `size` bytes to `locator`.
    ///
    /// `client_transfer_id` is an arbitrary caller-side id. With `resume`,
    /// the server reports how much of an earlier partial upload it already
    /// holds in the session's `seek_position`.
    pub async fn begin_upload(
        &self,
        locator: &FileLocator,
        client_transfer_id: u32,
        size: u64,
        overwrite: bool,
        resume: bool,
    ) -> Result<TransferSession, FileTransferError> {
        let command = Command::new(CommandName::InitUpload).with_args(
            locator.args("name").into_iter().chain([
                Arg::new("clientftfid", client_transfer_id),
                Arg::new("size", size),
                Arg::new("overwrite", overwrite),
                Arg::new("resume", resume),
            ]),
        );

        let mut session = self.decode_session(command).await?;
        // The upload response carries no size; keep the requested one.
        session.size = size;

        debug!(
            path = %locator.path,
            server_transfer_id = session.server_transfer_id,
            seek_position = session.seek_position,
            size,
            "upload initialised"
        );
        Ok(session)
    }

    /// Initialises a download of `locator` starting at `seek_position`.
    pub async fn begin_download(
        &self,
        locator: &FileLocator,
        client_transfer_id: u32,
        seek_position: u64,
    ) -> Result<TransferSession, FileTransferError> {
        let command = Command::new(CommandName::InitDownload).with_args(
            locator.args("name").into_iter().chain([
                Arg::new("clientftfid", client_transfer_id),
                Arg::new("seekpos", seek_position),
            ]),
        );

        let mut session = self.decode_session(command).await?;
        session.seek_position = seek_position;

        debug!(
            path = %locator.path,
            server_transfer_id = session.server_transfer_id,
            size = session.size,
            seek_position,
            "download initialised"
        );
        Ok(session)
    }

    /// Opens the data connection and streams the session's remaining bytes
    /// from `source`.
    pub async fn upload<R: AsyncRead + Unpin>(
        &self,
        session: TransferSession,
        source: &mut R,
        cancel: CancellationToken,
    ) -> Result<u64, FileTransferError> {
        let conn = self.open(session, cancel).await?;
        Ok(conn.upload(source).await?)
    }

    /// Opens the data connection and receives the session's remaining bytes
    /// into `sink`.
    pub async fn download<W: AsyncWrite + Unpin>(
        &self,
        session: TransferSession,
        sink: &mut W,
        cancel: CancellationToken,
    ) -> Result<u64, FileTransferError> {
        let conn = self.open(session, cancel).await?;
        Ok(conn.download(sink).await?)
    }

    async fn decode_session(&self, command: Command) -> Result<TransferSession, FileTransferError> {
        let name = command.name;
        let resp = self.execute(command).await?;
        let session: TransferSession = resp
            .decode_one()?
            .ok_or_else(|| FileTransferError::UnexpectedResponse(format!("empty {name} response")))?;
        if session.key.is_empty() {
            return Err(FileTransferError::UnexpectedResponse(format!(
                "{name} response without key"
            )));
        }
        Ok(session)
    }
}
