mod common;

use common::Tree;
use contextsync_container::ContextItem;
use contextsync_merge::{
    ChangeAction, ChangeDirection, ComponentFilter, MergeOptions, MergeStrategy, Merger,
};
use contextsync_types::{ComponentKey, TimestampField};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const DATA: ComponentKey = ComponentKey::Data;

/// Source holds `a` at t=200, target holds `a` at t=100.
fn diverged() -> (Tree, Tree) {
    let mut source = Tree::new("source");
    let mut target = Tree::new("target");
    source.put(DATA, "a", json!("from source"), 200);
    target.put(DATA, "a", json!("from target"), 100);
    (source, target)
}

fn merge(
    source: &mut Tree,
    target: &mut Tree,
    strategy: MergeStrategy,
) -> contextsync_merge::MergeResult {
    Merger::merge(source, target, strategy, &MergeOptions::default())
}

// ── Newer wins ───────────────────────────────────────────────────

#[test]
fn newer_source_wins_and_both_sides_converge() {
    let (mut source, mut target) = diverged();
    let result = merge(&mut source, &mut target, MergeStrategy::MergeNewerWins);

    assert!(result.success);
    assert_eq!(result.items_processed, 1);
    assert_eq!(result.conflicts, 1);
    assert_eq!(result.statistics.source_preferred, 1);
    assert_eq!(result.statistics.updated, 1);
    assert_eq!(source.peek(DATA, "a"), Some(json!("from source")));
    assert_eq!(target.peek(DATA, "a"), Some(json!("from source")));

    let change = &result.changes[0];
    assert_eq!(change.path, "data.a");
    assert_eq!(change.direction, ChangeDirection::IntoTarget);
    assert_eq!(change.previous, Some(json!("from target")));
    assert!(change.applied);
}

#[test]
fn newer_target_wins() {
    let mut source = Tree::new("source");
    let mut target = Tree::new("target");
    source.put(DATA, "a", json!(1), 100);
    target.put(DATA, "a", json!(2), 300);

    let result = merge(&mut source, &mut target, MergeStrategy::MergeNewerWins);
    assert_eq!(result.statistics.target_preferred, 1);
    assert_eq!(source.peek(DATA, "a"), Some(json!(2)));
    assert_eq!(result.changes[0].direction, ChangeDirection::IntoSource);
}

#[test]
fn equal_timestamps_go_to_the_target() {
    let mut source = Tree::new("source");
    let mut target = Tree::new("target");
    source.put(DATA, "a", json!("s"), 500);
    target.put(DATA, "a", json!("t"), 500);

    merge(&mut source, &mut target, MergeStrategy::MergeNewerWins);
    assert_eq!(source.peek(DATA, "a"), Some(json!("t")));
    assert_eq!(target.peek(DATA, "a"), Some(json!("t")));
}

#[test]
fn compare_by_selects_the_timestamp() {
    let mut source = Tree::new("source");
    let mut target = Tree::new("target");
    source.put(DATA, "a", json!("s"), 100);
    target.put(DATA, "a", json!("t"), 200);
    // Only the source has been read recently.
    source.data.get_item("a");

    let options = MergeOptions::default().with_compare_by(TimestampField::LastAccessedAt);
    Merger::merge(&mut source, &mut target, MergeStrategy::MergeNewerWins, &options);
    assert_eq!(target.peek(DATA, "a"), Some(json!("s")));
}

#[test]
fn preserved_metadata_carries_the_winner_timestamps() {
    let (mut source, mut target) = diverged();
    merge(&mut source, &mut target, MergeStrategy::MergeNewerWins);

    let winner = source.data.get("a").unwrap().timestamps();
    let copied = target.data.get("a").unwrap().timestamps();
    assert_eq!(winner, copied);
}

#[test]
fn without_preserved_metadata_nodes_are_fresh() {
    let (mut source, mut target) = diverged();
    let options = MergeOptions::default().with_preserve_metadata(false);
    Merger::merge(&mut source, &mut target, MergeStrategy::MergeNewerWins, &options);

    let copied = target.data.get("a").unwrap();
    assert_eq!(copied.to_value(), json!("from source"));
    assert!(copied.timestamp(TimestampField::ModifiedAt).wall_time() > 200);
}

// ── Priority strategies ──────────────────────────────────────────

#[test]
fn source_priority_ignores_timestamps() {
    let mut source = Tree::new("source");
    let mut target = Tree::new("target");
    source.put(DATA, "a", json!("old"), 1);
    target.put(DATA, "a", json!("new"), 999);

    merge(&mut source, &mut target, MergeStrategy::MergeSourcePriority);
    assert_eq!(target.peek(DATA, "a"), Some(json!("old")));
}

#[test]
fn target_priority_ignores_timestamps() {
    let (mut source, mut target) = diverged();
    merge(&mut source, &mut target, MergeStrategy::MergeTargetPriority);
    assert_eq!(source.peek(DATA, "a"), Some(json!("from target")));
}

#[test]
fn bidirectional_merge_fills_both_sides() {
    let mut source = Tree::new("source");
    let mut target = Tree::new("target");
    source.put(DATA, "mine", json!(1), 100);
    target.put(DATA, "yours", json!(2), 100);

    let result = merge(&mut source, &mut target, MergeStrategy::MergeSourcePriority);
    assert_eq!(result.statistics.created, 2);
    assert_eq!(source.peek(DATA, "yours"), Some(json!(2)));
    assert_eq!(target.peek(DATA, "mine"), Some(json!(1)));
    assert!(result.changes.iter().all(|c| c.action == ChangeAction::Created));
}

// ── Directional strategies ───────────────────────────────────────

#[test]
fn update_target_to_source_writes_only_the_target() {
    let (mut source, mut target) = diverged();
    target.put(DATA, "target_only", json!(true), 100);

    let result = merge(&mut source, &mut target, MergeStrategy::UpdateTargetToSource);
    assert_eq!(target.peek(DATA, "a"), Some(json!("from source")));
    assert_eq!(source.peek(DATA, "target_only"), None);
    assert_eq!(target.peek(DATA, "target_only"), Some(json!(true)));
    assert!(result.changes.iter().all(|c| c.direction == ChangeDirection::IntoTarget));
}

#[test]
fn update_source_to_target_writes_only_the_source() {
    let (mut source, mut target) = diverged();
    source.put(DATA, "source_only", json!(1), 100);

    merge(&mut source, &mut target, MergeStrategy::UpdateSourceToTarget);
    assert_eq!(source.peek(DATA, "a"), Some(json!("from target")));
    assert_eq!(target.peek(DATA, "source_only"), None);
    assert_eq!(source.peek(DATA, "source_only"), Some(json!(1)));
}

#[test]
fn create_missing_off_leaves_one_sided_paths_alone() {
    let mut source = Tree::new("source");
    let mut target = Tree::new("target");
    source.put(DATA, "mine", json!(1), 100);

    let options = MergeOptions::default().with_create_missing(false);
    let result = Merger::merge(&mut source, &mut target, MergeStrategy::MergeNewerWins, &options);
    assert_eq!(target.peek(DATA, "mine"), None);
    assert_eq!(result.statistics.skipped, 1);
    assert!(result.changes.is_empty());
}

// ── Replace and dry runs ─────────────────────────────────────────

#[test]
fn replace_swaps_whole_components() {
    let mut source = Tree::new("source");
    let mut target = Tree::new("target");
    source.put(DATA, "a", json!(1), 100);
    target.put(DATA, "a", json!(2), 900);
    target.put(DATA, "b", json!(3), 900);

    let result = merge(&mut source, &mut target, MergeStrategy::Replace);
    assert!(result.success);
    assert_eq!(result.items_processed, 1);
    assert_eq!(target.data.to_value(), json!({"a": 1}));
    assert_eq!(result.changes[0].action, ChangeAction::Replaced);
    assert_eq!(result.changes[0].path, "data");
}

#[test]
fn replace_skips_frozen_components() {
    let mut source = Tree::new("source");
    source.schema = ContextItem::frozen(json!({"version": 9}));
    let mut target = Tree::new("target");

    let result = merge(&mut source, &mut target, MergeStrategy::Replace);
    assert_eq!(target.schema.peek(), &json!({"version": 1}));
    assert_eq!(result.statistics.skipped, 1);
    assert!(!result.changes[0].applied);
}

#[test]
fn scoped_replace_removes_paths_absent_from_the_source() {
    let mut source = Tree::new("source");
    let mut target = Tree::new("target");
    target.put(DATA, "gone", json!(1), 100);
    target.put(DATA, "kept", json!(2), 100);

    let options = MergeOptions::default().with_single_item("data.gone");
    Merger::merge(&mut source, &mut target, MergeStrategy::Replace, &options);
    assert_eq!(target.data.to_value(), json!({"kept": 2}));
}

#[test]
fn no_action_only_reports() {
    let (mut source, mut target) = diverged();
    let result = merge(&mut source, &mut target, MergeStrategy::NoAction);

    assert_eq!(result.items_processed, 1);
    assert_eq!(result.statistics.skipped, 1);
    assert_eq!(result.changes.len(), 1);
    assert!(!result.changes[0].applied);
    assert_eq!(result.applied_changes().count(), 0);
    assert_eq!(target.peek(DATA, "a"), Some(json!("from target")));
}

// ── Hooks, scope and frozen targets ──────────────────────────────

#[test]
fn on_conflict_overrides_the_strategy() {
    let (mut source, mut target) = diverged();
    let options = MergeOptions::default().with_on_conflict(|conflict| {
        assert_eq!(conflict.path, "data.a");
        assert_eq!(conflict.strategy, MergeStrategy::MergeNewerWins);
        Some(json!("negotiated"))
    });

    let result = Merger::merge(&mut source, &mut target, MergeStrategy::MergeNewerWins, &options);
    assert_eq!(result.changes.len(), 2);
    assert_eq!(source.peek(DATA, "a"), Some(json!("negotiated")));
    assert_eq!(target.peek(DATA, "a"), Some(json!("negotiated")));
}

#[test]
fn on_conflict_returning_none_defers_to_the_strategy() {
    let (mut source, mut target) = diverged();
    let options = MergeOptions::default().with_on_conflict(|_| None);
    Merger::merge(&mut source, &mut target, MergeStrategy::MergeNewerWins, &options);
    assert_eq!(target.peek(DATA, "a"), Some(json!("from source")));
}

#[test]
fn single_item_merges_one_path() {
    let (mut source, mut target) = diverged();
    source.put(DATA, "b", json!("source b"), 900);
    target.put(DATA, "b", json!("target b"), 100);

    let options = MergeOptions::default().with_single_item("data.a");
    let result = Merger::merge(&mut source, &mut target, MergeStrategy::MergeNewerWins, &options);
    assert_eq!(result.items_processed, 1);
    assert_eq!(target.peek(DATA, "a"), Some(json!("from source")));
    assert_eq!(target.peek(DATA, "b"), Some(json!("target b")));
}

#[test]
fn single_item_inside_a_leaf_payload_keeps_siblings() {
    let mut source = Tree::new("source");
    let mut target = Tree::new("target");
    source.put(DATA, "player", json!({"name": "Source", "level": 1}), 100);
    target.put(DATA, "player", json!({"name": "Target", "level": 2}), 100);

    let options = MergeOptions::default().with_single_item("data.player.level");
    Merger::merge(&mut source, &mut target, MergeStrategy::MergeSourcePriority, &options);
    assert_eq!(
        target.peek(DATA, "player"),
        Some(json!({"name": "Target", "level": 1}))
    );
}

#[test]
fn invalid_single_item_fails_without_writing() {
    let (mut source, mut target) = diverged();
    let options = MergeOptions::default().with_single_item("elsewhere.a");
    let result = Merger::merge(&mut source, &mut target, MergeStrategy::MergeNewerWins, &options);
    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(target.peek(DATA, "a"), Some(json!("from target")));
}

#[test]
fn frozen_components_are_skipped_not_forced() {
    let mut source = Tree::new("source");
    source.schema = ContextItem::frozen(json!({"version": 2}));
    let mut target = Tree::new("target");

    let result = merge(&mut source, &mut target, MergeStrategy::MergeSourcePriority);
    assert!(result.success);
    assert_eq!(result.statistics.skipped, 1);
    assert_eq!(target.schema.peek(), &json!({"version": 1}));
}

#[test]
fn component_filter_excludes_components() {
    let (mut source, mut target) = diverged();
    source.put(ComponentKey::Flags, "debug", json!(true), 100);

    let options = MergeOptions::default().with_components(ComponentFilter {
        include_components: None,
        exclude_components: vec![DATA],
    });
    Merger::merge(&mut source, &mut target, MergeStrategy::MergeNewerWins, &options);
    assert_eq!(target.peek(DATA, "a"), Some(json!("from target")));
    assert_eq!(target.peek(ComponentKey::Flags, "debug"), Some(json!(true)));
}

// ── Analysis ─────────────────────────────────────────────────────

#[test]
fn analyze_predicts_without_writing_or_calling_hooks() {
    let (source, target) = diverged();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let options = MergeOptions::default().with_on_conflict(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        None
    });

    let analysis = Merger::analyze(&source, &target, MergeStrategy::MergeNewerWins, &options);
    assert_eq!(analysis.would_process, 1);
    assert_eq!(analysis.potential_conflicts, 1);
    assert_eq!(analysis.predicted_changes.len(), 1);
    assert_eq!(analysis.differences.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(target.peek(DATA, "a"), Some(json!("from target")));
}

#[test]
fn analyze_replace() {
    let (source, target) = diverged();
    let analysis =
        Merger::analyze(&source, &target, MergeStrategy::Replace, &MergeOptions::default());
    assert_eq!(analysis.predicted_changes.len(), 1);
    assert_eq!(analysis.predicted_changes[0].action, ChangeAction::Replaced);
}

// ── Idempotency ──────────────────────────────────────────────────

#[test]
fn second_merge_has_nothing_to_do() {
    let (mut source, mut target) = diverged();
    source.put(DATA, "left", json!(1), 10);
    target.put(DATA, "right", json!(2), 10);

    merge(&mut source, &mut target, MergeStrategy::MergeNewerWins);
    let again = merge(&mut source, &mut target, MergeStrategy::MergeNewerWins);
    assert_eq!(again.items_processed, 0);
    assert!(again.changes.is_empty());
}

fn leaves() -> impl Strategy<Value = Vec<(String, i64, u64)>> {
    prop::collection::vec(("[a-e]", any::<i64>(), 1u64..1_000), 0..6)
}

proptest! {
    #[test]
    fn newer_wins_converges_and_is_idempotent(left in leaves(), right in leaves()) {
        let mut source = Tree::new("source");
        let mut target = Tree::new("target");
        for (key, value, millis) in left {
            source.put(DATA, &key, json!(value), millis);
        }
        for (key, value, millis) in right {
            target.put(DATA, &key, json!(value), millis);
        }

        merge(&mut source, &mut target, MergeStrategy::MergeNewerWins);
        prop_assert_eq!(source.data.to_value(), target.data.to_value());

        let again = merge(&mut source, &mut target, MergeStrategy::MergeNewerWins);
        prop_assert_eq!(again.items_processed, 0);
    }
}
