use contextsync_container::SetOptions;
use contextsync_context::{ContextConfig, InitializationParams, SetOverrides};
use contextsync_storage::{
    ContextFactory, ExternalContextManager, MemoryStorage, StorageAdapter, StorageError,
    StoreOutcome,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn manager() -> ExternalContextManager {
    ExternalContextManager::with_adapter(StorageAdapter::new(Arc::new(MemoryStorage::new())))
}

fn set(manager: &ExternalContextManager, location: &str, path: &str, value: serde_json::Value) {
    let shared = manager.get_or_create(location).unwrap();
    shared
        .write()
        .unwrap()
        .set_item(path, value, SetOptions::default(), SetOverrides::local())
        .unwrap();
}

// ── Registry ─────────────────────────────────────────────────────

#[test]
fn get_or_create_returns_the_same_context() {
    let manager = manager();
    let a = manager.get_or_create("local").unwrap();
    let b = manager.get_or_create("local").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.read().unwrap().context_location(), "local");
    assert_eq!(manager.locations().unwrap(), vec!["local".to_string()]);
}

#[test]
fn get_does_not_create() {
    let manager = manager();
    assert!(manager.get("local").unwrap().is_none());
    assert!(manager.locations().unwrap().is_empty());
}

#[test]
fn remove_keeps_storage() {
    let manager = manager();
    set(&manager, "local", "data.score", json!(3));
    manager.persist("local").unwrap();

    assert!(manager.remove("local").unwrap().is_some());
    assert!(manager.get("local").unwrap().is_none());

    let restored = manager.get_or_create("local").unwrap();
    assert_eq!(restored.read().unwrap().peek_item("data.score"), Some(json!(3)));
}

#[test]
fn purge_deletes_storage_too() {
    let manager = manager();
    set(&manager, "local", "data.score", json!(3));
    manager.persist("local").unwrap();

    assert!(manager.purge("local").unwrap());
    let fresh = manager.get_or_create("local").unwrap();
    assert_eq!(fresh.read().unwrap().peek_item("data.score"), None);
}

// ── Persistence ──────────────────────────────────────────────────

#[test]
fn persist_unknown_location_is_not_found() {
    let manager = manager();
    assert!(matches!(
        manager.persist("nowhere"),
        Err(StorageError::NotFound(location)) if location == "nowhere"
    ));
}

#[test]
fn persist_busy_context_is_a_lock_error() {
    let manager = manager();
    let shared = manager.get_or_create("local").unwrap();
    let _guard = shared.write().unwrap();
    assert!(matches!(manager.persist("local"), Err(StorageError::Lock(_))));
}

#[test]
fn persist_twice_merges() {
    let manager = manager();
    set(&manager, "local", "data.score", json!(1));
    assert_eq!(manager.persist("local").unwrap(), StoreOutcome::Written);
    assert!(matches!(manager.persist("local").unwrap(), StoreOutcome::Merged(_)));
}

#[test]
fn persist_all_writes_every_location() {
    let manager = manager();
    set(&manager, "local", "data.a", json!(1));
    set(&manager, "session", "data.b", json!(2));

    assert_eq!(manager.persist_all().unwrap(), 2);
    assert_eq!(
        manager.adapter().keys().unwrap(),
        vec!["local".to_string(), "session".to_string()]
    );
}

#[test]
fn restore_replaces_the_live_context() {
    let manager = manager();
    set(&manager, "local", "data.score", json!(1));
    manager.persist("local").unwrap();
    set(&manager, "local", "data.score", json!(99));

    let restored = manager.restore("local").unwrap().unwrap();
    assert_eq!(restored.read().unwrap().peek_item("data.score"), Some(json!(1)));
    let live = manager.get("local").unwrap().unwrap();
    assert!(Arc::ptr_eq(&restored, &live));
}

#[test]
fn restore_without_storage_is_none() {
    assert!(manager().restore("local").unwrap().is_none());
}

#[test]
fn created_contexts_follow_the_factory_template() {
    let template = ContextConfig {
        initialization_params: InitializationParams::default().with_data(json!({"seed": 1})),
        ..ContextConfig::default()
    };
    let manager = ExternalContextManager::new(
        StorageAdapter::new(Arc::new(MemoryStorage::new())),
        ContextFactory::new(template),
    );

    let ctx = manager.get_or_create("module:cart").unwrap();
    let ctx = ctx.read().unwrap();
    assert_eq!(ctx.context_location(), "module:cart");
    assert_eq!(ctx.peek_item("data.seed"), Some(json!(1)));
}
