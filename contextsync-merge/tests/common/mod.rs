#![allow(dead_code)]

use contextsync_container::{ComponentRef, ContextContainer, ContextItem, Node, SetOptions, Value};
use contextsync_merge::ComponentTree;
use contextsync_types::{ComponentKey, DotPath, HybridTimestamp, Timestamps};
use serde_json::json;

/// Minimal seven-component tree for exercising the helpers.
#[derive(Debug, Clone)]
pub struct Tree {
    pub name: &'static str,
    pub schema: ContextItem,
    pub constants: ContextItem,
    pub manifest: ContextItem,
    pub flags: ContextContainer,
    pub state: ContextContainer,
    pub data: ContextContainer,
    pub settings: ContextContainer,
}

impl Tree {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            schema: ContextItem::frozen(json!({"version": 1})),
            constants: ContextItem::frozen(json!({})),
            manifest: ContextItem::frozen(json!({})),
            flags: ContextContainer::new(),
            state: ContextContainer::new(),
            data: ContextContainer::new(),
            settings: ContextContainer::new(),
        }
    }

    /// Places a leaf whose timestamps are all `millis`.
    pub fn put(&mut self, key: ComponentKey, path: &str, value: Value, millis: u64) {
        let stamp = Timestamps::at(HybridTimestamp::from_millis(millis));
        let item = ContextItem::new(value).with_timestamps(stamp);
        let path = DotPath::parse(path).unwrap();
        self.container_mut(key)
            .unwrap()
            .set_node(&path, Node::Leaf(item), SetOptions::default())
            .unwrap();
    }

    pub fn peek(&self, key: ComponentKey, path: &str) -> Option<Value> {
        self.component(key).peek(Some(&DotPath::parse(path).unwrap()))
    }
}

impl ComponentTree for Tree {
    fn component(&self, key: ComponentKey) -> ComponentRef<'_> {
        match key {
            ComponentKey::Schema => ComponentRef::Item(&self.schema),
            ComponentKey::Constants => ComponentRef::Item(&self.constants),
            ComponentKey::Manifest => ComponentRef::Item(&self.manifest),
            ComponentKey::Flags => ComponentRef::Container(&self.flags),
            ComponentKey::State => ComponentRef::Container(&self.state),
            ComponentKey::Data => ComponentRef::Container(&self.data),
            ComponentKey::Settings => ComponentRef::Container(&self.settings),
        }
    }

    fn container_mut(&mut self, key: ComponentKey) -> Option<&mut ContextContainer> {
        match key {
            ComponentKey::Flags => Some(&mut self.flags),
            ComponentKey::State => Some(&mut self.state),
            ComponentKey::Data => Some(&mut self.data),
            ComponentKey::Settings => Some(&mut self.settings),
            ComponentKey::Schema | ComponentKey::Constants | ComponentKey::Manifest => None,
        }
    }

    fn label(&self) -> String {
        self.name.to_string()
    }
}
