//! Control-channel boundary for the query file-transfer client.
//!
//! Commands are built from a [`CommandName`] plus key/value arguments and
//! argument groups, handed to a [`QueryExecutor`], and the returned
//! [`Response`] records are decoded into the typed records in [`types`].
//! How commands are encoded on the wire is up to the executor.

pub mod command;
pub mod constants;
pub mod error;
pub mod executor;
pub mod response;
pub mod types;

// Re-export primary types for convenience.
pub use command::{Arg, ArgValue, CmdArg, Command};
pub use constants::CommandName;
pub use error::QueryError;
pub use executor::{QueryExecutor, QueryFuture};
pub use response::{Record, Response};
pub use types::{
    FileInfo, FileKind, FileLocator, TransferHandle, TransferSession, TransferState,
    TransferStatus,
};
