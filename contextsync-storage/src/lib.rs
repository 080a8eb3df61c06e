//! Storage collaborators for contextsync.
//!
//! - [`StorageBackend`]: string key-value store ([`MemoryStorage`], [`FileStorage`])
//! - [`StorageAdapter`]: snapshot persistence with merge-on-store
//! - [`ExternalContextManager`]: registry of live shared contexts by location
//! - [`ContextFactory`]: builds contexts for `local`, `session` and `module:<id>`

mod adapter;
mod backend;
mod error;
mod factory;
mod manager;

pub use adapter::{DEFAULT_KEY_PREFIX, StorageAdapter, StoreOutcome};
pub use backend::{FileStorage, MemoryStorage, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use factory::{ContextFactory, ContextLocation};
pub use manager::ExternalContextManager;
