//! Strategies and options for compare, merge and sync.

use contextsync_types::{ComponentKey, HybridTimestamp, TimestampField};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// How conflicting leaves are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeStrategy {
    /// The side with the later `compare_by` timestamp wins; ties go to the target.
    MergeNewerWins,
    /// The source value always wins.
    MergeSourcePriority,
    /// The target value always wins.
    MergeTargetPriority,
    /// Copy target leaves into the source; the target is not written.
    UpdateSourceToTarget,
    /// Copy source leaves into the target; the source is not written.
    UpdateTargetToSource,
    /// Replace whole target components with the source's.
    Replace,
    /// Dry run: report what `MergeNewerWins` would do without writing.
    NoAction,
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MergeStrategy::MergeNewerWins => "mergeNewerWins",
            MergeStrategy::MergeSourcePriority => "mergeSourcePriority",
            MergeStrategy::MergeTargetPriority => "mergeTargetPriority",
            MergeStrategy::UpdateSourceToTarget => "updateSourceToTarget",
            MergeStrategy::UpdateTargetToSource => "updateTargetToSource",
            MergeStrategy::Replace => "replace",
            MergeStrategy::NoAction => "noAction",
        };
        f.write_str(name)
    }
}

/// Component allowlist / denylist.
///
/// With no allowlist every component is selected; the denylist is applied
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentFilter {
    #[serde(default)]
    pub include_components: Option<Vec<ComponentKey>>,
    #[serde(default)]
    pub exclude_components: Vec<ComponentKey>,
}

impl ComponentFilter {
    #[must_use]
    pub fn allows(&self, key: ComponentKey) -> bool {
        let included = self
            .include_components
            .as_ref()
            .is_none_or(|list| list.contains(&key));
        included && !self.exclude_components.contains(&key)
    }

    /// Selected components in canonical order.
    #[must_use]
    pub fn selected(&self) -> Vec<ComponentKey> {
        ComponentKey::ALL
            .into_iter()
            .filter(|k| self.allows(*k))
            .collect()
    }
}

/// Options for [`crate::Comparison::compare`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareOptions {
    /// Which timestamp is reported alongside each difference.
    pub compare_by: TimestampField,
    pub components: ComponentFilter,
    /// Restrict the comparison to one `component.path`.
    pub single_item: Option<String>,
}

/// A conflicting leaf handed to an `on_conflict` hook.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub path: String,
    pub strategy: MergeStrategy,
    pub source_value: Value,
    pub target_value: Value,
    pub source_timestamp: HybridTimestamp,
    pub target_timestamp: HybridTimestamp,
}

/// Caller hook for conflicting leaves. Returning `Some` overrides the
/// strategy's pick for that leaf only.
pub type ConflictHandler = Arc<dyn Fn(&Conflict) -> Option<Value> + Send + Sync>;

/// Options for [`crate::Merger::merge`].
#[derive(Clone)]
pub struct MergeOptions {
    /// Timestamp consulted by `MergeNewerWins`.
    pub compare_by: TimestampField,
    /// Copy the winner's timestamps and metadata along with its value.
    pub preserve_metadata: bool,
    /// Create leaves that exist on one side only on the other side.
    pub create_missing: bool,
    pub components: ComponentFilter,
    /// Restrict the merge to one `component.path`.
    pub single_item: Option<String>,
    pub on_conflict: Option<ConflictHandler>,
}

impl MergeOptions {
    #[must_use]
    pub fn with_single_item(mut self, path: impl Into<String>) -> Self {
        self.single_item = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_compare_by(mut self, field: TimestampField) -> Self {
        self.compare_by = field;
        self
    }

    #[must_use]
    pub fn with_create_missing(mut self, create_missing: bool) -> Self {
        self.create_missing = create_missing;
        self
    }

    #[must_use]
    pub fn with_preserve_metadata(mut self, preserve: bool) -> Self {
        self.preserve_metadata = preserve;
        self
    }

    #[must_use]
    pub fn with_components(mut self, components: ComponentFilter) -> Self {
        self.components = components;
        self
    }

    #[must_use]
    pub fn with_on_conflict<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Conflict) -> Option<Value> + Send + Sync + 'static,
    {
        self.on_conflict = Some(Arc::new(handler));
        self
    }

    pub(crate) fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            compare_by: self.compare_by,
            components: self.components.clone(),
            single_item: self.single_item.clone(),
        }
    }
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            compare_by: TimestampField::ModifiedAt,
            preserve_metadata: true,
            create_missing: true,
            components: ComponentFilter::default(),
            single_item: None,
            on_conflict: None,
        }
    }
}

impl fmt::Debug for MergeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeOptions")
            .field("compare_by", &self.compare_by)
            .field("preserve_metadata", &self.preserve_metadata)
            .field("create_missing", &self.create_missing)
            .field("components", &self.components)
            .field("single_item", &self.single_item)
            .field("on_conflict", &self.on_conflict.is_some())
            .finish()
    }
}
