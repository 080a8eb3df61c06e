use contextsync_container::SetOptions;
use contextsync_context::{
    Context, ContextError, ContextSnapshot, InitializationParams, OperationsParams, SNAPSHOT_KIND,
    SetOverrides,
};
use contextsync_merge::{MergeOptions, MergeStrategy};
use pretty_assertions::assert_eq;
use serde_json::json;

fn sample() -> Context {
    let mut ctx = Context::new(
        InitializationParams::default()
            .with_location("module:inventory")
            .with_constants(json!({"slots": 12}))
            .with_data(json!({"items": ["sword"]}))
            .with_settings(json!({"sort": "name"})),
        OperationsParams::default(),
    )
    .unwrap();
    ctx.set_item("loose", json!(true), SetOptions::default(), SetOverrides::local())
        .unwrap();
    ctx
}

#[test]
fn snapshot_is_tagged() {
    let snapshot = sample().to_snapshot();
    assert_eq!(snapshot.kind, SNAPSHOT_KIND);
    assert_eq!(snapshot.context_location, "module:inventory");
    assert!(snapshot.saved_at().is_some());

    let value = serde_json::to_value(&snapshot).unwrap();
    assert!(ContextSnapshot::is_context(&value));
    assert!(!ContextSnapshot::is_context(&json!({"data": {}})));
}

#[test]
fn plain_value_has_every_component() {
    let plain = sample().to_snapshot().to_plain_value();
    assert_eq!(plain["data"], json!({"items": ["sword"]}));
    assert_eq!(plain["constants"], json!({"slots": 12}));
    assert_eq!(plain["flags"], json!({}));
    assert!(plain["timestamp"].is_i64());
}

#[test]
fn json_round_trip_restores_components() {
    let original = sample();
    let text = original.to_snapshot().to_json_string().unwrap();
    let restored = Context::from_snapshot(
        ContextSnapshot::from_json_str(&text).unwrap(),
        OperationsParams::default(),
    )
    .unwrap();

    assert_ne!(restored.id(), original.id());
    assert_eq!(restored.context_location(), "module:inventory");
    assert_eq!(restored.data(), original.data());
    assert_eq!(restored.settings(), original.settings());
    assert_eq!(restored.constants(), original.constants());
    assert_eq!(restored.peek_item("loose"), Some(json!(true)));
    assert!(restored.constants().is_frozen());
}

#[test]
fn restored_context_keeps_leaf_timestamps() {
    let mut original = sample();
    let snapshot = original.to_snapshot();
    let mut restored = Context::from_snapshot(snapshot, OperationsParams::default()).unwrap();

    original
        .set_item("data.items", json!(["axe"]), SetOptions::default(), SetOverrides::local())
        .unwrap();
    restored
        .merge(&mut original, MergeStrategy::MergeNewerWins, &MergeOptions::default())
        .unwrap();
    assert_eq!(restored.peek_item("data.items"), Some(json!(["axe"])));
}

#[test]
fn untagged_values_are_rejected() {
    let err = ContextSnapshot::from_json_str(r#"{"data": {}}"#).unwrap_err();
    assert!(matches!(err, ContextError::Validation(_)));

    let mut snapshot = sample().to_snapshot();
    snapshot.kind = "settings".to_string();
    let err = Context::from_snapshot(snapshot, OperationsParams::default()).unwrap_err();
    assert!(matches!(err, ContextError::Validation(_)));
}

#[test]
fn future_versions_are_rejected() {
    let mut value = serde_json::to_value(sample().to_snapshot()).unwrap();
    value["version"] = json!(99);
    let err = ContextSnapshot::from_value(value).unwrap_err();
    assert!(matches!(err, ContextError::Configuration(_)));
}
