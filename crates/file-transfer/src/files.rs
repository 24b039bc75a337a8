//! Local-file conveniences on top of the session API.

use std::io::SeekFrom;
use std::path::Path;

use queryft_protocol::FileLocator;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::FileTransfers;
use crate::error::FileTransferError;

impl FileTransfers<'_> {
    /// Uploads a local file, returning the bytes sent on this connection.
    ///
    /// With `resume`, the local file is read from the offset the server
    /// already holds.
    pub async fn upload_file(
        &self,
        locator: &FileLocator,
        client_transfer_id: u32,
        source: &Path,
        overwrite: bool,
        resume: bool,
        cancel: CancellationToken,
    ) -> Result<u64, FileTransferError> {
        let mut file = File::open(source).await?;
        let size = file.metadata().await?.len();

        let session = self
            .begin_upload(locator, client_transfer_id, size, overwrite, resume)
            .await?;
        if session.seek_position > 0 {
            file.seek(SeekFrom::Start(session.seek_position)).await?;
        }

        let sent = self.upload(session, &mut file, cancel).await?;
        info!(path = %locator.path, local = %source.display(), sent, "file uploaded");
        Ok(sent)
    }

    /// Downloads a file to `dest`, returning the bytes received on this
    /// connection.
    ///
    /// An existing `dest` is treated as a partial download and continued
    /// from its length. If the remote file is now shorter, the partial
    /// copy is discarded and the download restarts.
    pub async fn download_file(
        &self,
        locator: &FileLocator,
        client_transfer_id: u32,
        dest: &Path,
        cancel: CancellationToken,
    ) -> Result<u64, FileTransferError> {
        let local_len = match tokio::fs::metadata(dest).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        let mut session = self
            .begin_download(locator, client_transfer_id, local_len)
            .await?;
        if session.size < local_len {
            debug!(
                path = %locator.path,
                remote = session.size,
                local = local_len,
                "remote file shrank, restarting download"
            );
            self.stop(session.handle(), false).await?;
            session = self
                .begin_download(locator, client_transfer_id, 0)
                .await?;
        }

        let mut options = OpenOptions::new();
        options.create(true);
        if session.seek_position > 0 {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let mut file = options.open(dest).await?;

        let received = self.download(session, &mut file, cancel).await?;
        file.flush().await?;
        info!(path = %locator.path, local = %dest.display(), received, "file downloaded");
        Ok(received)
    }

    /// Downloads a whole file into memory.
    pub async fn download_to_vec(
        &self,
        locator: &FileLocator,
        client_transfer_id: u32,
        cancel: CancellationToken,
    ) -> Result<Vec<u8>, FileTransferError> {
        let session = self.begin_download(locator, client_transfer_id, 0).await?;
        // The reported size is not trusted for the up-front allocation.
        let capacity = usize::try_from(session.remaining())
            .unwrap_or(usize::MAX)
            .min(self.config().buffer_size);
        let mut buf = Vec::with_capacity(capacity);
        self.download(session, &mut buf, cancel).await?;
        Ok(buf)
    }
}
