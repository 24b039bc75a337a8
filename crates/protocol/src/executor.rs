//! The control-channel collaborator.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

use crate::command::Command;
use crate::error::QueryError;
use crate::response::Response;

/// Boxed future returned by [`QueryExecutor::execute`].
pub type QueryFuture<'a> = Pin<Box<dyn Future<Output = Result<Response, QueryError>> + Send + 'a>>;

/// Executes commands over an established control connection.
///
/// Implementations own login, encoding, and request/response correlation.
/// At most one request is expected in flight at a time; callers sharing an
/// executor across tasks rely on the implementation to serialise them.
pub trait QueryExecutor: Send + Sync {
    /// Sends a command and waits for its decoded response.
    fn execute(&self, command: Command) -> QueryFuture<'_>;

    /// Remote address of the control connection.
    ///
    /// Data connections are opened to the same host.
    fn peer_addr(&self) -> SocketAddr;

    /// Timeout configured for the control connection.
    fn timeout(&self) -> Duration;
}
