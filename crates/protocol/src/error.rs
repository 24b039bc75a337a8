//! Control-channel error type.

use crate::constants::ERR_DATABASE_EMPTY_RESULT;

/// Errors reported by a [`QueryExecutor`](crate::QueryExecutor).
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The server rejected the command.
    #[error("server error {id}: {message}")]
    Server { id: u32, message: String },

    #[error("query timed out")]
    Timeout,

    #[error("control connection closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl QueryError {
    /// Creates a server-side rejection.
    pub fn server(id: u32, message: impl Into<String>) -> Self {
        Self::Server {
            id,
            message: message.into(),
        }
    }

    /// Returns the server error id, if this is a server rejection.
    pub fn server_id(&self) -> Option<u32> {
        match self {
            Self::Server { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Returns `true` for the "empty result set" rejection that list
    /// commands use to signal zero entries.
    pub fn is_empty_result(&self) -> bool {
        self.server_id() == Some(ERR_DATABASE_EMPTY_RESULT)
    }
}
