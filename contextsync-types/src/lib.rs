//! Core type definitions for contextsync.
//!
//! This crate defines the small, dependency-light types shared by every
//! other crate in the workspace:
//! - Context identifiers (UUID v7)
//! - Hybrid Logical Clock timestamps and the per-node timestamp triple
//! - Component keys for the seven named context components
//! - Dot-path parsing

mod component;
mod ids;
mod path;
mod timestamp;

pub use component::ComponentKey;
pub use ids::ContextId;
pub use path::{
    DotPath, MAX_RENAMED_SEGMENTS, RESERVED_KEYS, is_reserved_key, renamed_reserved_key,
};
pub use timestamp::{HybridTimestamp, TimestampField, Timestamps};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    #[error("unknown component: {0}")]
    UnknownComponent(String),
}
