use queryft_data_channel::{ConfigError, DataConnection, TransferConfig};
use queryft_protocol::{Command, QueryExecutor, Response, TransferSession};
use tokio_util::sync::CancellationToken;

use crate::error::FileTransferError;

/// File transfer operations over a borrowed control channel.
///
/// Holds a non-owning reference to the executor: sessions and data
/// connections never keep the control channel alive, and the executor
/// must outlive the operations issued through it.
pub struct FileTransfers<'a> {
    query: &'a dyn QueryExecutor,
    config: TransferConfig,
}

impl<'a> FileTransfers<'a> {
    pub fn new(query: &'a dyn QueryExecutor) -> Self {
        Self {
            query,
            config: TransferConfig::default(),
        }
    }

    /// Replaces the data-connection settings after validating them.
    pub fn with_config(mut self, config: TransferConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Opens the data connection for a session.
    ///
    /// The host is taken from the control connection's peer address and
    /// the dial is bounded by its timeout unless the config overrides it.
    /// Cancelling `cancel` later closes the connection.
    pub async fn open(
        &self,
        session: TransferSession,
        cancel: CancellationToken,
    ) -> Result<DataConnection, FileTransferError> {
        let timeout = self.config.connect_timeout(self.query.timeout());
        let conn = DataConnection::open(session, self.query.peer_addr(), timeout, cancel).await?;
        Ok(conn.with_buffer_size(self.config.buffer_size))
    }

    pub(crate) async fn execute(&self, command: Command) -> Result<Response, FileTransferError> {
        Ok(self.query.execute(command).await?)
    }

    /// Executes a list command, mapping the "empty result set" rejection to
    /// an empty response.
    pub(crate) async fn execute_list(
        &self,
        command: Command,
    ) -> Result<Response, FileTransferError> {
        match self.query.execute(command).await {
            Ok(resp) => Ok(resp),
            Err(e) if e.is_empty_result() => Ok(Response::empty()),
            Err(e) => Err(e.into()),
        }
    }
}
