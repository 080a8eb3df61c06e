//! Structural comparison of two component trees.

use crate::diff::{self, DiffPoint};
use crate::options::CompareOptions;
use crate::tree::ComponentTree;
use contextsync_container::ContextContainer;
use contextsync_types::{ComponentKey, HybridTimestamp, TimestampField};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Overall verdict of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareStatus {
    Equal,
    Different,
    /// The scoped `single_item` path is absent on at least one side.
    Missing,
}

/// How a path differs, read from the target's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DifferenceKind {
    /// Present in the source only.
    Added,
    /// Present in the target only.
    Removed,
    /// Present on both sides with different values.
    Modified,
}

/// One differing path. Timestamps are those selected by `compare_by`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Difference {
    pub path: String,
    pub kind: DifferenceKind,
    pub source_value: Option<Value>,
    pub target_value: Option<Value>,
    pub source_timestamp: Option<HybridTimestamp>,
    pub target_timestamp: Option<HybridTimestamp>,
}

impl Difference {
    pub(crate) fn from_point(point: &DiffPoint, compare_by: TimestampField) -> Self {
        let kind = match (&point.source, &point.target) {
            (Some(_), None) => DifferenceKind::Added,
            (None, Some(_)) => DifferenceKind::Removed,
            _ => DifferenceKind::Modified,
        };
        Self {
            path: point.full_path(),
            kind,
            source_value: point.source.as_ref().map(|n| n.to_value()),
            target_value: point.target.as_ref().map(|n| n.to_value()),
            source_timestamp: point.source.as_ref().map(|n| n.timestamp(compare_by)),
            target_timestamp: point.target.as_ref().map(|n| n.timestamp(compare_by)),
        }
    }
}

/// Outcome of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResult {
    pub result: CompareStatus,
    pub compare_by: TimestampField,
    pub components: Vec<ComponentKey>,
    pub differences: Vec<Difference>,
    pub errors: Vec<String>,
}

impl CompareResult {
    #[must_use]
    pub fn is_equal(&self) -> bool {
        self.result == CompareStatus::Equal
    }

    /// Differences of the given kind.
    pub fn of_kind(&self, kind: DifferenceKind) -> impl Iterator<Item = &Difference> {
        self.differences.iter().filter(move |d| d.kind == kind)
    }
}

/// Structural diff between two trees or containers.
///
/// Equality is decided on existence and value only; timestamps are reported
/// alongside each difference but never make two values unequal.
pub struct Comparison;

impl Comparison {
    /// Compares the selected components of two trees.
    pub fn compare<S, T>(source: &S, target: &T, options: &CompareOptions) -> CompareResult
    where
        S: ComponentTree + ?Sized,
        T: ComponentTree + ?Sized,
    {
        let components = options.components.selected();
        let mut result = CompareResult {
            result: CompareStatus::Equal,
            compare_by: options.compare_by,
            components: components.clone(),
            differences: Vec::new(),
            errors: Vec::new(),
        };

        let scope = match diff::parse_scope(options.single_item.as_deref()) {
            Ok(scope) => scope,
            Err(err) => {
                result.result = CompareStatus::Missing;
                result.errors.push(err.to_string());
                return result;
            }
        };

        let points = diff::diff_trees(source, target, &components, scope.as_ref());
        result.differences = points
            .iter()
            .map(|p| Difference::from_point(p, options.compare_by))
            .collect();

        let missing = scope.as_ref().is_some_and(|scope| {
            let path = scope.path.as_ref();
            source.component(scope.component).peek(path).is_none()
                || target.component(scope.component).peek(path).is_none()
        });

        result.result = if missing {
            CompareStatus::Missing
        } else if result.differences.is_empty() {
            CompareStatus::Equal
        } else {
            CompareStatus::Different
        };
        result
    }

    /// Compares two standalone containers. Paths carry no component prefix.
    #[must_use]
    pub fn compare_containers(
        source: &ContextContainer,
        target: &ContextContainer,
        compare_by: TimestampField,
    ) -> CompareResult {
        let differences: Vec<Difference> = diff::diff_container_pair(source, target)
            .iter()
            .map(|p| Difference::from_point(p, compare_by))
            .collect();
        CompareResult {
            result: if differences.is_empty() {
                CompareStatus::Equal
            } else {
                CompareStatus::Different
            },
            compare_by,
            components: Vec::new(),
            differences,
            errors: Vec::new(),
        }
    }
}
