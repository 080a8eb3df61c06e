//! The contextsync context aggregate.
//!
//! A [`Context`] bundles seven named components behind one dot-path API:
//! - `schema`, `constants`, `manifest`: frozen items
//! - `flags`, `state`, `data`, `settings`: mutable containers
//!
//! Contexts can pull from and push to peer contexts they reference weakly
//! (see [`PeerRef`]), merge with each other through the
//! [`contextsync_merge`] helpers, and round-trip through [`ContextSnapshot`]
//! for storage.

mod config;
mod context;
mod engine;
mod error;
mod metrics;
mod peer;
mod snapshot;

pub use config::{
    ContextConfig, DEFAULT_CONTEXT_LOCATION, DEFAULT_PULL_COOLDOWN_MS, ErrorHandling, ErrorPolicy,
    InitializationParams, NamingConvention, OperationsParams, default_initialization_params,
    default_naming_convention, default_operations_params,
};
pub use context::{Context, Reinitialize, SetOverrides};
pub use engine::{PeerSyncReport, SkipReason};
pub use error::{ContextError, ContextResult};
pub use metrics::{PerformanceMetrics, PullCooldown};
pub use peer::{PeerRef, SharedContext, share};
pub use snapshot::{ContextSnapshot, SNAPSHOT_KIND, SNAPSHOT_VERSION};
