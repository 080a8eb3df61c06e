use contextsync_container::{ComponentRef, ContextContainer, ContextItem, SetOptions};
use contextsync_types::DotPath;
use serde_json::json;

fn path(p: &str) -> DotPath {
    DotPath::parse(p).unwrap()
}

#[test]
fn item_component_is_navigable() {
    let item = ContextItem::frozen(json!({"app": {"version": "1.0"}}));
    let view = ComponentRef::from(&item);
    assert!(view.is_frozen());
    assert_eq!(view.peek(Some(&path("app.version"))), Some(json!("1.0")));
    assert!(view.has(Some(&path("app.version"))));
    assert!(!view.has(Some(&path("app.name"))));
    assert_eq!(view.size(), 1);
}

#[test]
fn container_component_follows_container_rules() {
    let data = ContextContainer::from_value(json!({"player": {"stats": {"level": 5}}}));
    let view = ComponentRef::from(&data);
    assert!(!view.is_frozen());
    assert_eq!(view.peek(Some(&path("player.stats.level"))), Some(json!(5)));
    assert!(view.has(Some(&path("player"))));
    assert!(!view.has(Some(&path("player.stats"))));
}

#[test]
fn whole_component_peek() {
    let mut flags = ContextContainer::new();
    flags.set_item("debug", json!(true), SetOptions::default()).unwrap();
    let view = ComponentRef::Container(&flags);
    assert_eq!(view.peek(None), Some(json!({"debug": true})));
    assert!(view.has(None));
}

#[test]
fn leaves_of_item_and_container() {
    let item = ContextItem::new(json!(1));
    let leaves = ComponentRef::from(&item).leaves();
    assert_eq!(leaves.len(), 1);
    assert!(leaves[0].0.is_none());

    let c = ContextContainer::from_value_recursive(json!({"a": {"b": 1}, "c": 2}));
    let paths: Vec<String> = ComponentRef::from(&c)
        .leaves()
        .into_iter()
        .map(|(p, _)| p.unwrap().to_string())
        .collect();
    assert_eq!(paths, vec!["a.b", "c"]);
}
