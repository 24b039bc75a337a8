//! File transfer error types.

use queryft_data_channel::DataChannelError;
use queryft_protocol::QueryError;

/// Errors produced by file transfer operations.
#[derive(Debug, thiserror::Error)]
pub enum FileTransferError {
    /// The control channel rejected or failed the command. Never retried.
    #[error("query failed: {0}")]
    Protocol(#[from] QueryError),

    /// The data connection could not be opened or broke mid-stream.
    /// Retrying requires a fresh handshake, since keys are single-use.
    #[error("data channel error: {0}")]
    Transport(DataChannelError),

    /// The payload ended before the declared byte count.
    #[error("short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: u64, actual: u64 },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Local file I/O in the file helpers.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DataChannelError> for FileTransferError {
    fn from(err: DataChannelError) -> Self {
        match err {
            DataChannelError::ShortTransfer { expected, actual } => {
                Self::ShortTransfer { expected, actual }
            }
            DataChannelError::Local(e) => Self::Io(e),
            other => Self::Transport(other),
        }
    }
}

impl FileTransferError {
    /// `true` for networking faults on the data connection.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// `true` for control-channel failures, including server rejections.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    /// Server error id, if the control channel rejected the command.
    pub fn server_error_id(&self) -> Option<u32> {
        match self {
            Self::Protocol(e) => e.server_id(),
            _ => None,
        }
    }
}
