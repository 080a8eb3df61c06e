//! Error types for the storage layer.

use contextsync_context::ContextError;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Nothing stored under the key.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid backend or factory configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A lock was poisoned or a context was busy.
    #[error("lock error: {0}")]
    Lock(String),

    /// Error raised by a context operation.
    #[error("context error: {0}")]
    Context(#[from] ContextError),
}
