//! File transfers over a query control channel.
//!
//! A transfer starts with a handshake command on the control channel
//! ([`FileTransfers::begin_upload`] / [`FileTransfers::begin_download`]),
//! which yields a [`TransferSession`]. The session's one-time key then
//! authenticates a separate data connection that carries the file bytes.
//! Repository queries and transfer control are plain control-channel
//! commands.
//!
//! The control channel itself is supplied by the caller as a
//! [`QueryExecutor`]; [`FileTransfers`] only borrows it.

mod client;
mod control;
mod error;
mod files;
mod handshake;
#[cfg(test)]
mod loopback;

pub use client::FileTransfers;
pub use error::FileTransferError;

pub use queryft_data_channel::{ConfigError, DataConnection, TransferConfig};
pub use queryft_protocol::{
    FileInfo, FileKind, FileLocator, QueryError, QueryExecutor, TransferHandle, TransferSession,
    TransferState, TransferStatus,
};
