//! Conflict resolution between two component trees.

use crate::comparison::Comparison;
use crate::diff::{self, DiffPoint, Scope};
use crate::error::MergeError;
use crate::options::{Conflict, MergeOptions, MergeStrategy};
use crate::result::{ChangeAction, ChangeDirection, MergeAnalysis, MergeChange, MergeResult};
use crate::tree::ComponentTree;
use contextsync_container::{ComponentRef, ContextContainer, ContextItem, Node, SetOptions};
use contextsync_types::{ComponentKey, DotPath, TimestampField};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Source,
    Target,
}

/// A write decided by the planner, not yet applied.
#[derive(Debug, Clone)]
struct PlannedWrite {
    component: ComponentKey,
    path: Option<DotPath>,
    node: Node,
    within_leaf: bool,
    change: MergeChange,
}

/// Merge engine.
///
/// Bidirectional strategies (`MergeNewerWins`, `MergeSourcePriority`,
/// `MergeTargetPriority`) write each resolved value into whichever side
/// lost, so both trees agree afterwards and an immediate second merge finds
/// nothing to do.
pub struct Merger;

impl Merger {
    /// Merges `source` and `target` under `strategy`.
    pub fn merge<S, T>(
        source: &mut S,
        target: &mut T,
        strategy: MergeStrategy,
        options: &MergeOptions,
    ) -> MergeResult
    where
        S: ComponentTree + ?Sized,
        T: ComponentTree + ?Sized,
    {
        let mut result = MergeResult::new(strategy);
        let scope = match diff::parse_scope(options.single_item.as_deref()) {
            Ok(scope) => scope,
            Err(err) => {
                result.fail(err);
                return result;
            }
        };
        let components = options.components.selected();

        debug!(
            source = %source.label(),
            target = %target.label(),
            %strategy,
            single_item = ?options.single_item,
            "Merging component trees"
        );

        if strategy == MergeStrategy::Replace {
            replace(&*source, target, &components, scope.as_ref(), &mut result);
            return result;
        }

        let points = diff::diff_trees(&*source, &*target, &components, scope.as_ref());
        let writes = plan(&points, strategy, options, true, &mut result);

        if strategy == MergeStrategy::NoAction {
            result.statistics.skipped += writes.len();
            result.changes.extend(writes.into_iter().map(|w| w.change));
            return result;
        }

        let (into_source, into_target): (Vec<_>, Vec<_>) = writes
            .into_iter()
            .partition(|w| w.change.direction == ChangeDirection::IntoSource);
        apply(source, into_source, &mut result);
        apply(target, into_target, &mut result);

        debug!(
            strategy = %strategy,
            processed = result.items_processed,
            conflicts = result.conflicts,
            changes = result.changes.len(),
            "Merge complete"
        );
        result
    }

    /// One-directional merge from `from` into `into`; `from` is only read.
    ///
    /// Equivalent to `merge(from, into, UpdateTargetToSource, ..)` without
    /// requiring mutable access to `from`.
    pub fn merge_into<S, T>(from: &S, into: &mut T, options: &MergeOptions) -> MergeResult
    where
        S: ComponentTree + ?Sized,
        T: ComponentTree + ?Sized,
    {
        let strategy = MergeStrategy::UpdateTargetToSource;
        let mut result = MergeResult::new(strategy);
        let scope = match diff::parse_scope(options.single_item.as_deref()) {
            Ok(scope) => scope,
            Err(err) => {
                result.fail(err);
                return result;
            }
        };
        let components = options.components.selected();
        let points = diff::diff_trees(from, &*into, &components, scope.as_ref());
        let writes = plan(&points, strategy, options, true, &mut result);
        apply(into, writes, &mut result);
        result
    }

    /// Predicts what [`Merger::merge`] would do without writing anything.
    ///
    /// `on_conflict` hooks are not invoked.
    pub fn analyze<S, T>(
        source: &S,
        target: &T,
        strategy: MergeStrategy,
        options: &MergeOptions,
    ) -> MergeAnalysis
    where
        S: ComponentTree + ?Sized,
        T: ComponentTree + ?Sized,
    {
        let components = options.components.selected();
        let mut analysis = MergeAnalysis {
            strategy,
            components: components.clone(),
            would_process: 0,
            potential_conflicts: 0,
            predicted_changes: Vec::new(),
            differences: Vec::new(),
            errors: Vec::new(),
        };
        let scope = match diff::parse_scope(options.single_item.as_deref()) {
            Ok(scope) => scope,
            Err(err) => {
                analysis.errors.push(err.to_string());
                return analysis;
            }
        };

        let points = diff::diff_trees(source, target, &components, scope.as_ref());
        analysis.would_process = points.len();
        analysis.potential_conflicts = points.iter().filter(|p| p.is_conflict()).count();
        analysis.differences =
            Comparison::compare(source, target, &options.compare_options()).differences;

        analysis.predicted_changes = if strategy == MergeStrategy::Replace {
            replace_predictions(source, target, &components, scope.as_ref())
        } else {
            let mut scratch = MergeResult::new(strategy);
            plan(&points, strategy, options, false, &mut scratch)
                .into_iter()
                .map(|w| w.change)
                .collect()
        };
        analysis
    }
}

/// Which side a strategy prefers for a leaf present on both sides.
fn pick_winner(
    strategy: MergeStrategy,
    source: &Node,
    target: &Node,
    compare_by: TimestampField,
) -> Side {
    match strategy {
        MergeStrategy::MergeNewerWins | MergeStrategy::NoAction => {
            // Equal timestamps go to the target.
            if source.timestamp(compare_by) > target.timestamp(compare_by) {
                Side::Source
            } else {
                Side::Target
            }
        }
        MergeStrategy::MergeSourcePriority
        | MergeStrategy::UpdateTargetToSource
        | MergeStrategy::Replace => Side::Source,
        MergeStrategy::MergeTargetPriority | MergeStrategy::UpdateSourceToTarget => Side::Target,
    }
}

/// Sides a strategy is allowed to write into.
fn writable_sides(strategy: MergeStrategy) -> (bool, bool) {
    match strategy {
        MergeStrategy::UpdateSourceToTarget => (true, false),
        MergeStrategy::UpdateTargetToSource => (false, true),
        _ => (true, true),
    }
}

fn prepare(node: &Node, preserve_metadata: bool) -> Node {
    if preserve_metadata {
        return node.clone();
    }
    match node {
        Node::Leaf(item) => Node::Leaf(ContextItem::new(item.peek().clone())),
        Node::Container(c) => Node::Container(ContextContainer::from_value_recursive(c.to_value())),
    }
}

fn plan(
    points: &[DiffPoint],
    strategy: MergeStrategy,
    options: &MergeOptions,
    invoke_hook: bool,
    result: &mut MergeResult,
) -> Vec<PlannedWrite> {
    let (source_writable, target_writable) = writable_sides(strategy);
    let mut writes = Vec::new();

    for point in points {
        let Some(component) = point.component else {
            continue;
        };
        result.items_processed += 1;
        let full_path = point.full_path();

        match (&point.source, &point.target) {
            (Some(s), Some(t)) => {
                result.conflicts += 1;
                let winner = pick_winner(strategy, s, t, options.compare_by);
                match winner {
                    Side::Source => result.statistics.source_preferred += 1,
                    Side::Target => result.statistics.target_preferred += 1,
                }

                let chosen = if invoke_hook {
                    options.on_conflict.as_ref().and_then(|hook| {
                        hook(&Conflict {
                            path: full_path.clone(),
                            strategy,
                            source_value: s.to_value(),
                            target_value: t.to_value(),
                            source_timestamp: s.timestamp(options.compare_by),
                            target_timestamp: t.timestamp(options.compare_by),
                        })
                    })
                } else {
                    None
                };

                let node = match chosen {
                    Some(value) => Node::leaf(value),
                    None => match winner {
                        Side::Source => prepare(s, options.preserve_metadata),
                        Side::Target => prepare(t, options.preserve_metadata),
                    },
                };
                let new_value = node.to_value();

                let mut wrote = false;
                if source_writable && s.to_value() != new_value {
                    writes.push(planned(
                        point,
                        component,
                        &full_path,
                        node.clone(),
                        ChangeAction::Updated,
                        ChangeDirection::IntoSource,
                        Some(s),
                    ));
                    wrote = true;
                }
                if target_writable && t.to_value() != new_value {
                    writes.push(planned(
                        point,
                        component,
                        &full_path,
                        node,
                        ChangeAction::Updated,
                        ChangeDirection::IntoTarget,
                        Some(t),
                    ));
                    wrote = true;
                }
                if !wrote {
                    result.statistics.skipped += 1;
                }
            }
            (Some(s), None) => {
                if !options.create_missing || !target_writable {
                    result.statistics.skipped += 1;
                    continue;
                }
                result.statistics.source_preferred += 1;
                let node = prepare(s, options.preserve_metadata);
                writes.push(planned(
                    point,
                    component,
                    &full_path,
                    node,
                    ChangeAction::Created,
                    ChangeDirection::IntoTarget,
                    None,
                ));
            }
            (None, Some(t)) => {
                if !options.create_missing || !source_writable {
                    result.statistics.skipped += 1;
                    continue;
                }
                result.statistics.target_preferred += 1;
                let node = prepare(t, options.preserve_metadata);
                writes.push(planned(
                    point,
                    component,
                    &full_path,
                    node,
                    ChangeAction::Created,
                    ChangeDirection::IntoSource,
                    None,
                ));
            }
            (None, None) => {}
        }
    }
    writes
}

fn planned(
    point: &DiffPoint,
    component: ComponentKey,
    full_path: &str,
    node: Node,
    action: ChangeAction,
    direction: ChangeDirection,
    previous: Option<&Node>,
) -> PlannedWrite {
    PlannedWrite {
        component,
        path: point.path.clone(),
        within_leaf: point.within_leaf,
        change: MergeChange {
            path: full_path.to_string(),
            action,
            direction,
            value: node.to_value(),
            previous: previous.map(Node::to_value),
            applied: false,
        },
        node,
    }
}

fn apply<C>(tree: &mut C, writes: Vec<PlannedWrite>, result: &mut MergeResult)
where
    C: ComponentTree + ?Sized,
{
    for mut write in writes {
        let outcome = write_node(tree, &write);
        match outcome {
            Ok(true) => {
                write.change.applied = true;
                match write.change.action {
                    ChangeAction::Created => result.statistics.created += 1,
                    ChangeAction::Updated | ChangeAction::Replaced => {
                        result.statistics.updated += 1;
                    }
                }
            }
            Ok(false) => {
                debug!(path = %write.change.path, "Skipping write into frozen component");
                result.statistics.skipped += 1;
            }
            Err(err) => {
                warn!(path = %write.change.path, error = %err, "Merge write failed");
                result.fail(err);
            }
        }
        result.changes.push(write.change);
    }
}

/// Returns `Ok(false)` when the component is frozen.
fn write_node<C>(tree: &mut C, write: &PlannedWrite) -> Result<bool, MergeError>
where
    C: ComponentTree + ?Sized,
{
    let Some(container) = tree.container_mut(write.component) else {
        return Ok(false);
    };
    let Some(path) = &write.path else {
        return Ok(false);
    };
    let outcome = if write.within_leaf {
        container
            .set_item(&path.to_string(), write.node.to_value(), SetOptions::default())
            .map(|_| ())
    } else {
        container.set_node(path, write.node.clone(), SetOptions::default())
    };
    outcome.map(|()| true).map_err(|source| MergeError::Container {
        path: write.change.path.clone(),
        source,
    })
}

fn replace<S, T>(
    source: &S,
    target: &mut T,
    components: &[ComponentKey],
    scope: Option<&Scope>,
    result: &mut MergeResult,
) where
    S: ComponentTree + ?Sized,
    T: ComponentTree + ?Sized,
{
    for &key in components {
        if scope.is_some_and(|s| s.component != key) {
            continue;
        }
        let path = scope.and_then(|s| s.path.as_ref());
        let s = source.component(key);
        let new_value = s.peek(path);
        let previous = target.component(key).peek(path);
        if new_value == previous {
            continue;
        }
        result.items_processed += 1;
        result.conflicts += usize::from(previous.is_some() && new_value.is_some());

        let full_path = match path {
            Some(p) => format!("{key}.{p}"),
            None => key.to_string(),
        };
        let mut change = MergeChange {
            path: full_path.clone(),
            action: ChangeAction::Replaced,
            direction: ChangeDirection::IntoTarget,
            value: new_value.clone().unwrap_or_default(),
            previous,
            applied: false,
        };

        let Some(dest) = target.container_mut(key) else {
            debug!(component = %key, "Skipping replace of frozen component");
            result.statistics.skipped += 1;
            result.changes.push(change);
            continue;
        };

        let outcome = match (path, s) {
            (None, ComponentRef::Container(src)) => {
                let enhanced = dest.enhanced_nested_path_checking();
                *dest = src.clone().with_enhanced_nested_path_checking(enhanced);
                Ok(())
            }
            (None, ComponentRef::Item(_)) => Err(MergeError::Frozen(key)),
            (Some(path), _) => {
                let written = match (s.as_container().and_then(|c| c.get_node(path)), new_value) {
                    (Some(node), _) => dest.set_node(path, node.clone(), SetOptions::default()),
                    (None, Some(value)) => dest
                        .set_item(&path.to_string(), value, SetOptions::default())
                        .map(|_| ()),
                    (None, None) => dest.remove_item(&path.to_string()).map(|_| ()),
                };
                written.map_err(|source| MergeError::Container {
                    path: full_path.clone(),
                    source,
                })
            }
        };

        match outcome {
            Ok(()) => {
                change.applied = true;
                result.statistics.source_preferred += 1;
                result.statistics.updated += 1;
            }
            Err(err) => result.fail(err),
        }
        result.changes.push(change);
    }
}

fn replace_predictions<S, T>(
    source: &S,
    target: &T,
    components: &[ComponentKey],
    scope: Option<&Scope>,
) -> Vec<MergeChange>
where
    S: ComponentTree + ?Sized,
    T: ComponentTree + ?Sized,
{
    components
        .iter()
        .filter(|&&key| scope.is_none_or(|s| s.component == key))
        .filter_map(|&key| {
            let path = scope.and_then(|s| s.path.as_ref());
            let new_value = source.component(key).peek(path);
            let previous = target.component(key).peek(path);
            (new_value != previous).then(|| MergeChange {
                path: match path {
                    Some(p) => format!("{key}.{p}"),
                    None => key.to_string(),
                },
                action: ChangeAction::Replaced,
                direction: ChangeDirection::IntoTarget,
                value: new_value.unwrap_or_default(),
                previous,
                applied: false,
            })
        })
        .collect()
}
