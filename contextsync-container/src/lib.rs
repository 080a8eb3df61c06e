//! Nested key-value containers for contextsync.
//!
//! - [`ContextItem`]: a single value slot, optionally frozen, with timestamps
//! - [`ContextContainer`]: an ordered map of keys to [`Node`]s with dot-path
//!   traversal and auto-vivification of intermediate containers
//! - [`ComponentRef`]: a borrowed view of either, as exposed by a context
//!
//! Container bookkeeping (timestamps, metadata, frozen flag) lives in struct
//! fields and never shares the key namespace, so a user key named `value` or
//! `size` is stored and retrieved like any other key.

mod component;
mod container;
mod error;
mod item;
pub mod json;
mod node;

pub use component::ComponentRef;
pub use container::{ContextContainer, SetOptions};
pub use error::{ContainerError, ContainerResult};
pub use item::ContextItem;
pub use node::Node;

/// Re-exported so downstream crates name one value type.
pub use serde_json::Value;
