//! Data channel for query file transfers.
//!
//! After a handshake on the control channel yields a
//! [`TransferSession`](queryft_protocol::TransferSession), the file bytes
//! travel over a separate TCP connection to the same host. The connection
//! is authenticated by writing the session's one-time key as its first
//! bytes, then carries the raw payload with no further framing.
//!
//! ```text
//! CLIENT -> SERVER: [key bytes, verbatim]
//! UPLOAD:           CLIENT -> SERVER [size - seekpos bytes]
//! DOWNLOAD:         SERVER -> CLIENT [size - seekpos bytes]
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod stream;

pub use config::{ConfigError, TransferConfig};
pub use connection::{DataConnection, data_endpoint};
pub use error::DataChannelError;
pub use stream::ChunkPump;

/// Default streaming chunk size (16 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;
