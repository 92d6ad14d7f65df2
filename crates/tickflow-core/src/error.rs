//! Error taxonomy for the tickflow operation surface

use thiserror::Error;

/// Errors surfaced by the execution engine and its collaborators
///
/// Two failure families intentionally never appear here: CAS conflicts on
/// tick (resolved transparently by returning the winner's state) and event
/// sink failures (always swallowed at the boundary).
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input to an operation (empty symbol, unknown market)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown id, or a task not owned by the caller
    ///
    /// Ownership failures deliberately report as not-found so callers
    /// cannot probe for foreign task ids.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation not valid for the task's current status
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Execution or report store write failed; fatal to the request
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// A market data provider failed or returned nothing
    ///
    /// The pipeline absorbs these into log lines; the variant exists for
    /// callers that talk to the gateway directly.
    #[error("upstream degraded: {0}")]
    UpstreamDegraded(String),
}

impl Error {
    /// Whether this error is the caller's fault (4xx-equivalent)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument(_) | Error::NotFound(_) | Error::InvalidState(_)
        )
    }
}

/// Result type alias for tickflow operations
pub type Result<T> = std::result::Result<T, Error>;
