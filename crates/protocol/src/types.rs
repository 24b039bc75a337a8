use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::command::Arg;

/// Identifies a file or directory inside a channel's file repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FileLocator {
    /// Channel owning the repository (0 means unset).
    pub channel_id: u32,
    /// Channel password, if the channel is protected.
    pub password: Option<String>,
    /// Path inside the repository, e.g. `/docs/readme.txt`.
    pub path: String,
}

impl FileLocator {
    pub fn new(channel_id: u32, path: impl Into<String>) -> Self {
        Self {
            channel_id,
            password: None,
            path: path.into(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Password as sent on the wire (empty when unset).
    pub fn password_arg(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }

    /// Scope arguments (`cid`, `cpw`) followed by the path under `path_key`.
    pub fn args(&self, path_key: &'static str) -> Vec<Arg> {
        vec![
            Arg::new("cid", self.channel_id),
            Arg::new("cpw", self.password_arg()),
            Arg::new(path_key, self.path.as_str()),
        ]
    }
}

/// Negotiated state of one file transfer, produced by a handshake.
///
/// The session is not `Clone`: its key authorises exactly one
/// data connection, and opening that connection consumes the session.
#[derive(Debug, PartialEq, Eq, Deserialize)]
pub struct TransferSession {
    #[serde(rename = "clientftfid")]
    pub client_transfer_id: u32,
    #[serde(rename = "serverftfid")]
    pub server_transfer_id: u32,
    #[serde(rename = "ftkey")]
    pub key: String,
    pub port: u16,
    #[serde(rename = "seekpos", default)]
    pub seek_position: u64,
    #[serde(default)]
    pub size: u64,
}

impl TransferSession {
    /// Bytes still to move over the data connection.
    pub fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.seek_position)
    }

    /// Identifiers needed to stop the transfer after the session is consumed.
    pub fn handle(&self) -> TransferHandle {
        TransferHandle {
            client_transfer_id: self.client_transfer_id,
            server_transfer_id: self.server_transfer_id,
        }
    }
}

/// Copyable reference to a transfer, used for control operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferHandle {
    pub client_transfer_id: u32,
    pub server_transfer_id: u32,
}

/// Lifecycle of a transfer as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Initialising,
    Active,
    Finished,
    Unknown(u32),
}

impl From<u32> for TransferState {
    fn from(code: u32) -> Self {
        match code {
            0 => Self::Initialising,
            1 => Self::Active,
            2 => Self::Finished,
            other => Self::Unknown(other),
        }
    }
}

/// Snapshot of a running transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferStatus {
    #[serde(rename = "clientftfid")]
    pub client_transfer_id: u32,
    #[serde(rename = "serverftfid")]
    pub server_transfer_id: u32,
    #[serde(rename = "clid")]
    pub client_id: u32,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "sizedone", alias = "sizeDone", default)]
    pub size_done: u64,
    #[serde(default)]
    pub sender: u32,
    #[serde(default)]
    pub status: u32,
    #[serde(default)]
    pub current_speed: f64,
    #[serde(default)]
    pub average_speed: f64,
    /// Elapsed time in milliseconds.
    #[serde(rename = "runtime", default)]
    pub runtime_ms: u64,
}

impl TransferStatus {
    pub fn runtime(&self) -> Duration {
        Duration::from_millis(self.runtime_ms)
    }

    pub fn state(&self) -> TransferState {
        TransferState::from(self.status)
    }

    /// `true` when the client is the sending side.
    pub fn is_upload(&self) -> bool {
        self.sender == 1
    }

    pub fn is_download(&self) -> bool {
        !self.is_upload()
    }

    /// Completed fraction in `[0, 1]`. Zero-sized transfers report 1.
    pub fn progress(&self) -> f64 {
        if self.size == 0 {
            return 1.0;
        }
        (self.size_done as f64 / self.size as f64).clamp(0.0, 1.0)
    }
}

/// Kind of repository entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum FileKind {
    Directory,
    File,
}

impl From<u8> for FileKind {
    fn from(code: u8) -> Self {
        if code == 0 { Self::Directory } else { Self::File }
    }
}

impl From<FileKind> for u8 {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::Directory => 0,
            FileKind::File => 1,
        }
    }
}

/// Metadata of a repository entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(rename = "cid", default)]
    pub channel_id: u32,
    /// Parent path, echoed by list responses.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "datetime", with = "chrono::serde::ts_seconds")]
    pub modified: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: FileKind,
}

impl FileInfo {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}
