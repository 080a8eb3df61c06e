//! Error types for merge and sync operations.

use contextsync_container::ContainerError;
use contextsync_types::ComponentKey;
use thiserror::Error;

/// Errors raised while resolving or applying a merge.
///
/// These never escape [`crate::Merger::merge`]; they are rendered into
/// `MergeResult::errors` and flip `success` to false.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The `single_item` path does not start with a component name.
    #[error("invalid item path: {0:?}")]
    InvalidPath(String),

    /// A write was routed to a component that cannot be borrowed mutably.
    #[error("component {0} is frozen")]
    Frozen(ComponentKey),

    /// A container rejected the write.
    #[error("container error at {path}: {source}")]
    Container {
        path: String,
        #[source]
        source: ContainerError,
    },
}
