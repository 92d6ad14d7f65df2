//! Error types for storage operations

use thiserror::Error;

/// Storage-layer failures
///
/// Unlike gateway failures these are fatal to the request that hit them:
/// a task whose state cannot be persisted cannot be advanced.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unavailable or rejected the operation
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Record could not be encoded/decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Insert with an id that already exists
    #[error("duplicate id: {0}")]
    DuplicateId(String),
}

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for tickflow_core::Error {
    fn from(err: StoreError) -> Self {
        tickflow_core::Error::StorageFailure(err.to_string())
    }
}
