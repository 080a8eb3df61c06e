//! Merge outcome types.

use crate::comparison::Difference;
use crate::options::MergeStrategy;
use contextsync_types::ComponentKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a change did to the receiving side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeAction {
    /// The path did not exist on the receiving side.
    Created,
    /// The path existed with a different value.
    Updated,
    /// A whole component (or scoped node) was replaced.
    Replaced,
}

/// Which side received a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeDirection {
    IntoSource,
    IntoTarget,
}

/// One write performed (or, for dry runs, predicted) by a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeChange {
    pub path: String,
    pub action: ChangeAction,
    pub direction: ChangeDirection,
    pub value: Value,
    pub previous: Option<Value>,
    /// False for dry runs and skipped writes.
    pub applied: bool,
}

/// Per-merge counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStatistics {
    /// Differing leaves resolved in favour of the source.
    pub source_preferred: usize,
    /// Differing leaves resolved in favour of the target.
    pub target_preferred: usize,
    /// Writes that created a missing path.
    pub created: usize,
    /// Writes that replaced an existing value.
    pub updated: usize,
    /// Differing leaves left as they were (frozen, dry run, or not created).
    pub skipped: usize,
}

/// Outcome of [`crate::Merger::merge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub success: bool,
    pub strategy: MergeStrategy,
    /// Number of differing leaves examined. Zero means both sides already
    /// agreed on every selected path.
    pub items_processed: usize,
    /// Leaves present on both sides with different values.
    pub conflicts: usize,
    pub changes: Vec<MergeChange>,
    pub statistics: MergeStatistics,
    pub errors: Vec<String>,
}

impl MergeResult {
    pub(crate) fn new(strategy: MergeStrategy) -> Self {
        Self {
            success: true,
            strategy,
            items_processed: 0,
            conflicts: 0,
            changes: Vec::new(),
            statistics: MergeStatistics::default(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn fail(&mut self, error: impl ToString) {
        self.success = false;
        self.errors.push(error.to_string());
    }

    /// Changes that were actually written.
    pub fn applied_changes(&self) -> impl Iterator<Item = &MergeChange> {
        self.changes.iter().filter(|c| c.applied)
    }
}

/// Prediction returned by [`crate::Merger::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeAnalysis {
    pub strategy: MergeStrategy,
    pub components: Vec<ComponentKey>,
    /// Differing leaves a merge would examine.
    pub would_process: usize,
    /// Of those, leaves present on both sides.
    pub potential_conflicts: usize,
    /// Writes the merge would perform.
    pub predicted_changes: Vec<MergeChange>,
    pub differences: Vec<Difference>,
    pub errors: Vec<String>,
}
