//! Error types for the data channel.

/// Errors produced by the data channel.
#[derive(Debug, thiserror::Error)]
pub enum DataChannelError {
    /// Socket-level failure: dial, key write, or mid-stream I/O.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reading the upload source or writing the download sink.
    #[error("local I/O error: {0}")]
    Local(std::io::Error),

    #[error("connection timed out")]
    Timeout,

    /// The connection was closed locally while in use.
    #[error("connection closed")]
    Closed,

    #[error("invalid transfer key: {0}")]
    InvalidKey(String),

    /// The stream ended before the declared byte count.
    #[error("short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: u64, actual: u64 },
}
