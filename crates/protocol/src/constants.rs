use std::fmt;

use serde::{Deserialize, Serialize};

/// Control-channel command identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandName {
    // Transfer handshake
    #[serde(rename = "ftinitupload")]
    InitUpload,
    #[serde(rename = "ftinitdownload")]
    InitDownload,

    // Transfer control
    #[serde(rename = "ftstop")]
    Stop,
    #[serde(rename = "ftlist")]
    List,

    // Repository queries
    #[serde(rename = "ftgetfilelist")]
    GetFileList,
    #[serde(rename = "ftgetfileinfo")]
    GetFileInfo,

    // Repository mutations
    #[serde(rename = "ftdeletefile")]
    DeleteFile,
    #[serde(rename = "ftrenamefile")]
    RenameFile,
    #[serde(rename = "ftcreatedir")]
    CreateDir,
}

impl CommandName {
    /// Returns the wire name of the command.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitUpload => "ftinitupload",
            Self::InitDownload => "ftinitdownload",
            Self::Stop => "ftstop",
            Self::List => "ftlist",
            Self::GetFileList => "ftgetfilelist",
            Self::GetFileInfo => "ftgetfileinfo",
            Self::DeleteFile => "ftdeletefile",
            Self::RenameFile => "ftrenamefile",
            Self::CreateDir => "ftcreatedir",
        }
    }

    /// Returns `true` if the command accepts argument groups.
    pub fn is_batchable(&self) -> bool {
        matches!(self, Self::GetFileInfo | Self::DeleteFile)
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server error id: the result set is empty (lists with no entries).
pub const ERR_DATABASE_EMPTY_RESULT: u32 = 1281;
/// Server error id: file transfer id already in use.
pub const ERR_FILE_TRANSFER_ID_IN_USE: u32 = 2049;
/// Server error id: invalid file name.
pub const ERR_FILE_INVALID_NAME: u32 = 2048;
/// Server error id: file not found.
pub const ERR_FILE_NOT_FOUND: u32 = 2051;
/// Server error id: file already exists.
pub const ERR_FILE_ALREADY_EXISTS: u32 = 2050;
/// Server error id: invalid file transfer id.
pub const ERR_FILE_TRANSFER_INVALID_ID: u32 = 2054;
