//! Error types for container operations.

use thiserror::Error;

/// Result type for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Errors that can occur when mutating items and containers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// Write attempted against a frozen item or container.
    #[error("cannot modify frozen {target}")]
    Frozen { target: String },

    /// Path is empty or has an empty segment.
    #[error("invalid path: {0:?}")]
    InvalidPath(String),
}

impl ContainerError {
    pub(crate) fn frozen(target: impl Into<String>) -> Self {
        Self::Frozen {
            target: target.into(),
        }
    }
}

impl From<contextsync_types::Error> for ContainerError {
    fn from(err: contextsync_types::Error) -> Self {
        match err {
            contextsync_types::Error::InvalidPath(path) => Self::InvalidPath(path),
            other => Self::InvalidPath(other.to_string()),
        }
    }
}
