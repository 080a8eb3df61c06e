//! Comparison, merge and sync helpers for contextsync.
//!
//! All three helpers operate on anything implementing [`ComponentTree`]: a
//! set of seven named components where only the mutable containers can be
//! borrowed mutably.
//!
//! - [`Comparison`]: structural diff (added / removed / modified leaves)
//! - [`Merger`]: conflict resolution under a [`MergeStrategy`]
//! - [`Synchronizer`]: one-directional copy of a whole tree or one path
//!
//! Only `Replace` deletes: under every other strategy a leaf present on one
//! side only is either created on the other side (`create_missing`) or left
//! alone. Writes into frozen
//! components are skipped and counted, never forced.

mod comparison;
mod diff;
mod error;
mod merger;
mod options;
mod result;
mod sync;
mod tree;

pub use comparison::{CompareResult, CompareStatus, Comparison, Difference, DifferenceKind};
pub use error::MergeError;
pub use merger::Merger;
pub use options::{
    CompareOptions, ComponentFilter, Conflict, ConflictHandler, MergeOptions, MergeStrategy,
};
pub use result::{
    ChangeAction, ChangeDirection, MergeAnalysis, MergeChange, MergeResult, MergeStatistics,
};
pub use sync::{SyncOperation, SyncOptions, SyncResult, Synchronizer};
pub use tree::ComponentTree;
