//! Error types for the context layer.

use contextsync_container::ContainerError;
use contextsync_types::ComponentKey;
use thiserror::Error;

/// Result type for context operations.
pub type ContextResult<T> = Result<T, ContextError>;

/// Errors that can occur in context operations.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Invalid construction arguments. Never policy-gated.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Write attempted against schema, constants or manifest.
    #[error("component {component} is frozen")]
    FrozenMutation { component: ComponentKey },

    /// A pull or push against a peer failed.
    #[error("sync with peer {peer} failed: {message}")]
    Sync { peer: String, message: String },

    /// A write was rejected by validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Container error.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ContextError {
    pub(crate) fn sync(peer: impl ToString, message: impl Into<String>) -> Self {
        Self::Sync {
            peer: peer.to_string(),
            message: message.into(),
        }
    }

    /// True for errors that pull/push policies may swallow.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Sync { .. })
    }
}
