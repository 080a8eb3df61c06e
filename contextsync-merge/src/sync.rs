//! Directional copy between two component trees.

use crate::merger::Merger;
use crate::options::{ComponentFilter, MergeOptions};
use crate::tree::ComponentTree;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Direction of a sync call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncOperation {
    /// Copy the target's content into the source.
    UpdateSourceToTarget,
    /// Copy the source's content into the target.
    UpdateTargetToSource,
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SyncOperation::UpdateSourceToTarget => "updateSourceToTarget",
            SyncOperation::UpdateTargetToSource => "updateTargetToSource",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub components: ComponentFilter,
    /// Copy timestamps and metadata along with values.
    pub preserve_metadata: bool,
    /// Create paths missing on the receiving side.
    pub create_missing: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            components: ComponentFilter::default(),
            preserve_metadata: true,
            create_missing: true,
        }
    }
}

impl SyncOptions {
    fn merge_options(&self, item_path: Option<&str>) -> MergeOptions {
        MergeOptions {
            preserve_metadata: self.preserve_metadata,
            create_missing: self.create_missing,
            components: self.components.clone(),
            single_item: item_path.map(str::to_string),
            ..MergeOptions::default()
        }
    }
}

/// Outcome of a sync call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub operation: SyncOperation,
    /// Writes applied to the receiving side.
    pub items_processed: usize,
    /// Set for item-level syncs.
    pub item_path: Option<String>,
    pub errors: Vec<String>,
}

/// Sync helper.
///
/// Sync never deletes and never writes into frozen components; paths
/// present only on the receiving side are left as they are.
pub struct Synchronizer;

impl Synchronizer {
    /// Copies every selected component of `from` into `into`.
    pub fn copy<S, T>(from: &S, into: &mut T, options: &SyncOptions) -> SyncResult
    where
        S: ComponentTree + ?Sized,
        T: ComponentTree + ?Sized,
    {
        Self::run(from, into, None, SyncOperation::UpdateTargetToSource, options)
    }

    /// Copies the single `component.path` of `from` into `into`.
    pub fn copy_item<S, T>(
        from: &S,
        into: &mut T,
        item_path: &str,
        options: &SyncOptions,
    ) -> SyncResult
    where
        S: ComponentTree + ?Sized,
        T: ComponentTree + ?Sized,
    {
        Self::run(from, into, Some(item_path), SyncOperation::UpdateTargetToSource, options)
    }

    /// Whole-tree sync in the direction given by `operation`.
    pub fn sync<S, T>(
        source: &mut S,
        target: &mut T,
        operation: SyncOperation,
        options: &SyncOptions,
    ) -> SyncResult
    where
        S: ComponentTree + ?Sized,
        T: ComponentTree + ?Sized,
    {
        match operation {
            SyncOperation::UpdateTargetToSource => {
                Self::run(&*source, target, None, operation, options)
            }
            SyncOperation::UpdateSourceToTarget => {
                Self::run(&*target, source, None, operation, options)
            }
        }
    }

    /// Item-level sync of one `component.path`.
    pub fn sync_item<S, T>(
        source: &mut S,
        target: &mut T,
        item_path: &str,
        operation: SyncOperation,
        options: &SyncOptions,
    ) -> SyncResult
    where
        S: ComponentTree + ?Sized,
        T: ComponentTree + ?Sized,
    {
        match operation {
            SyncOperation::UpdateTargetToSource => {
                Self::run(&*source, target, Some(item_path), operation, options)
            }
            SyncOperation::UpdateSourceToTarget => {
                Self::run(&*target, source, Some(item_path), operation, options)
            }
        }
    }

    fn run<S, T>(
        from: &S,
        into: &mut T,
        item_path: Option<&str>,
        operation: SyncOperation,
        options: &SyncOptions,
    ) -> SyncResult
    where
        S: ComponentTree + ?Sized,
        T: ComponentTree + ?Sized,
    {
        let merged = Merger::merge_into(from, into, &options.merge_options(item_path));
        let items_processed = merged.applied_changes().count();
        debug!(
            from = %from.label(),
            into = %into.label(),
            %operation,
            item_path = ?item_path,
            items_processed,
            "Sync complete"
        );
        SyncResult {
            success: merged.success,
            operation,
            items_processed,
            item_path: item_path.map(str::to_string),
            errors: merged.errors,
        }
    }
}
