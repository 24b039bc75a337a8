//! Transfer control and repository operations.
//!
//! Batched commands (`ftgetfileinfo`, `ftdeletefile`) send one argument
//! group per locator in a single call. The server reports one aggregate
//! result for the batch, so a single missing file fails the whole call.

use queryft_protocol::{
    Arg, Command, CommandName, FileInfo, FileLocator, TransferHandle, TransferStatus,
};
use tracing::debug;

use crate::client::FileTransfers;
use crate::error::FileTransferError;

impl FileTransfers<'_> {
    /// Stops a transfer. With `delete_incomplete`, the server discards any
    /// partially uploaded data.
    ///
    /// Valid after the data connection has closed; the server decides
    /// whether the transfer is still known.
    pub async fn stop(
        &self,
        handle: TransferHandle,
        delete_incomplete: bool,
    ) -> Result<(), FileTransferError> {
        let command = Command::new(CommandName::Stop).with_args([
            Arg::new("serverftfid", handle.server_transfer_id),
            Arg::new("delete", delete_incomplete),
        ]);
        self.execute(command).await?;
        debug!(
            server_transfer_id = handle.server_transfer_id,
            delete_incomplete, "transfer stopped"
        );
        Ok(())
    }

    /// Lists transfers the server is tracking for this session.
    ///
    /// Order is server-defined and may change between polls.
    pub async fn list_active_transfers(&self) -> Result<Vec<TransferStatus>, FileTransferError> {
        let resp = self.execute_list(Command::new(CommandName::List)).await?;
        Ok(resp.decode_all()?)
    }

    /// Lists the direct children of a directory.
    pub async fn list_files(
        &self,
        locator: &FileLocator,
    ) -> Result<Vec<FileInfo>, FileTransferError> {
        let command = Command::new(CommandName::GetFileList).with_args(locator.args("path"));
        let resp = self.execute_list(command).await?;
        Ok(resp.decode_all()?)
    }

    /// Returns metadata for each locator, in request order.
    pub async fn get_file_info(
        &self,
        locators: &[FileLocator],
    ) -> Result<Vec<FileInfo>, FileTransferError> {
        let command = batch(CommandName::GetFileInfo, locators)?;
        let resp = self.execute(command).await?;

        if resp.len() != locators.len() {
            return Err(FileTransferError::UnexpectedResponse(format!(
                "requested {} entries, got {}",
                locators.len(),
                resp.len()
            )));
        }
        Ok(resp.decode_all()?)
    }

    /// Deletes files in one call; all-or-nothing as reported by the server.
    pub async fn delete_files(&self, locators: &[FileLocator]) -> Result<(), FileTransferError> {
        let command = batch(CommandName::DeleteFile, locators)?;
        self.execute(command).await?;
        debug!(count = locators.len(), "files deleted");
        Ok(())
    }

    /// Renames or moves a file.
    ///
    /// When `new` names a different, non-zero channel, the target channel
    /// and its password are sent so the move crosses repositories.
    pub async fn rename_file(
        &self,
        old: &FileLocator,
        new: &FileLocator,
    ) -> Result<(), FileTransferError> {
        let mut args = vec![
            Arg::new("cid", old.channel_id),
            Arg::new("cpw", old.password_arg()),
            Arg::new("oldname", old.path.as_str()),
            Arg::new("newname", new.path.as_str()),
        ];
        if new.channel_id != 0 && new.channel_id != old.channel_id {
            args.push(Arg::new("tcid", new.channel_id));
            args.push(Arg::new("tcpw", new.password_arg()));
        }

        self.execute(Command::new(CommandName::RenameFile).with_args(args))
            .await?;
        debug!(from = %old.path, to = %new.path, "file renamed");
        Ok(())
    }

    /// Creates a directory in a channel's repository.
    pub async fn create_directory(&self, locator: &FileLocator) -> Result<(), FileTransferError> {
        let command = Command::new(CommandName::CreateDir).with_args(locator.args("dirname"));
        self.execute(command).await?;
        debug!(channel_id = locator.channel_id, path = %locator.path, "directory created");
        Ok(())
    }
}

fn batch(name: CommandName, locators: &[FileLocator]) -> Result<Command, FileTransferError> {
    debug_assert!(name.is_batchable());
    if locators.is_empty() {
        return Err(FileTransferError::InvalidArgument(format!(
            "{name} needs at least one file"
        )));
    }
    Ok(Command::new(name).with_groups(locators.iter().map(|l| l.args("name"))))
}
