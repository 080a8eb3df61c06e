//! Nested dot-path key-value container.

use crate::error::{ContainerError, ContainerResult};
use crate::item::ContextItem;
use crate::json;
use crate::node::Node;
use contextsync_types::{DotPath, HybridTimestamp, TimestampField, Timestamps};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Per-call write options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Write through a frozen container. Frozen items never honour this.
    pub ignore_frozen: bool,
}

impl SetOptions {
    /// Options with `ignore_frozen` set.
    #[must_use]
    pub const fn ignore_frozen() -> Self {
        Self {
            ignore_frozen: true,
        }
    }
}

/// A nested key-value store addressed by dot-paths.
///
/// Nested containers are always traversable. Plain JSON objects stored in a
/// leaf are traversed by reads, but [`ContextContainer::has_item`] only looks
/// inside them when `enhanced_nested_path_checking` is on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextContainer {
    entries: IndexMap<String, Node>,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    frozen: bool,
    timestamps: Timestamps,
    #[serde(default)]
    enhanced_nested_path_checking: bool,
}

impl ContextContainer {
    /// Creates an empty mutable container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            metadata: Value::Null,
            frozen: false,
            timestamps: Timestamps::now(),
            enhanced_nested_path_checking: false,
        }
    }

    /// Creates a container whose top-level keys are the keys of `value`.
    ///
    /// Nested objects stay plain JSON inside their leaf. A non-object value
    /// yields an empty container.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let mut container = Self::new();
        if let Value::Object(map) = value {
            for (key, v) in map {
                container.entries.insert(key, Node::leaf(v));
            }
        }
        container
    }

    /// Creates a container converting every nested object into a nested
    /// container.
    #[must_use]
    pub fn from_value_recursive(value: Value) -> Self {
        let mut container = Self::new();
        if let Value::Object(map) = value {
            for (key, v) in map {
                let node = if v.is_object() {
                    Node::Container(Self::from_value_recursive(v))
                } else {
                    Node::leaf(v)
                };
                container.entries.insert(key, node);
            }
        }
        container
    }

    /// Marks the container frozen (or not).
    #[must_use]
    pub fn with_frozen(mut self, frozen: bool) -> Self {
        self.frozen = frozen;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn with_timestamps(mut self, timestamps: Timestamps) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Sets the nested-path checking flag on this container and every
    /// nested container.
    #[must_use]
    pub fn with_enhanced_nested_path_checking(mut self, enabled: bool) -> Self {
        self.set_enhanced_nested_path_checking(enabled);
        self
    }

    pub fn set_enhanced_nested_path_checking(&mut self, enabled: bool) {
        self.enhanced_nested_path_checking = enabled;
        for node in self.entries.values_mut() {
            if let Node::Container(child) = node {
                child.set_enhanced_nested_path_checking(enabled);
            }
        }
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Returns the value at `path`, recording the access along the way.
    ///
    /// Returns `None` for missing and malformed paths (including `""`).
    pub fn get_item(&mut self, path: &str) -> Option<Value> {
        let path = DotPath::parse(path).ok()?;
        let value = self.resolve(path.segments())?;
        self.touch_path(path.segments());
        Some(value)
    }

    /// Returns the value at `path` without touching any timestamp.
    #[must_use]
    pub fn peek_item(&self, path: &str) -> Option<Value> {
        let path = DotPath::parse(path).ok()?;
        self.resolve(path.segments())
    }

    /// Returns the node stored at `path`, following nested containers only.
    #[must_use]
    pub fn get_node(&self, path: &DotPath) -> Option<&Node> {
        self.node_at(path.segments())
    }

    /// True if `path` resolves to a stored key.
    ///
    /// Plain-object payloads are opaque unless enhanced nested-path checking
    /// is enabled on the container holding them.
    #[must_use]
    pub fn has_item(&self, path: &str) -> bool {
        match DotPath::parse(path) {
            Ok(path) => self.has_segments(path.segments()),
            Err(_) => false,
        }
    }

    fn resolve(&self, segments: &[String]) -> Option<Value> {
        let (first, rest) = segments.split_first()?;
        let node = self.entries.get(first)?;
        if rest.is_empty() {
            return Some(node.to_value());
        }
        match node {
            Node::Container(child) => child.resolve(rest),
            Node::Leaf(item) => item.value_at(rest).cloned(),
        }
    }

    fn node_at(&self, segments: &[String]) -> Option<&Node> {
        let (first, rest) = segments.split_first()?;
        let node = self.entries.get(first)?;
        if rest.is_empty() {
            return Some(node);
        }
        node.as_container()?.node_at(rest)
    }

    fn has_segments(&self, segments: &[String]) -> bool {
        let Some((first, rest)) = segments.split_first() else {
            return false;
        };
        let Some(node) = self.entries.get(first) else {
            return false;
        };
        if rest.is_empty() {
            return true;
        }
        match node {
            Node::Container(child) => child.has_segments(rest),
            Node::Leaf(item) => {
                self.enhanced_nested_path_checking && json::contains(item.peek(), rest)
            }
        }
    }

    fn touch_path(&mut self, segments: &[String]) {
        self.timestamps.touch_accessed();
        let Some((first, rest)) = segments.split_first() else {
            return;
        };
        match self.entries.get_mut(first) {
            Some(Node::Container(child)) if !rest.is_empty() => child.touch_path(rest),
            Some(node) => node.touch_accessed(),
            None => {}
        }
    }

    pub(crate) fn touch_accessed(&mut self) {
        self.timestamps.touch_accessed();
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Writes `value` at `path`.
    ///
    /// Missing intermediate keys become containers. An intermediate leaf
    /// holding a plain object, or an array addressed by an in-bounds index,
    /// is written into; any other intermediate leaf is replaced by a fresh
    /// container, discarding its value.
    pub fn set_item(
        &mut self,
        path: &str,
        value: Value,
        options: SetOptions,
    ) -> ContainerResult<&mut Self> {
        let path = DotPath::parse(path)?;
        self.write_value(path.segments(), value, options)?;
        Ok(self)
    }

    /// Places a whole node at `path`, keeping its timestamps and metadata.
    pub fn set_node(
        &mut self,
        path: &DotPath,
        node: Node,
        options: SetOptions,
    ) -> ContainerResult<()> {
        self.place_node(path.segments(), node, options)
    }

    /// Removes the entry at `path`. Returns true if something was removed.
    pub fn remove_item(&mut self, path: &str) -> ContainerResult<bool> {
        let path = DotPath::parse(path)?;
        self.remove_segments(path.segments(), SetOptions::default())
    }

    /// Removes the entry at `path` with explicit options.
    pub fn remove_item_with(&mut self, path: &str, options: SetOptions) -> ContainerResult<bool> {
        let path = DotPath::parse(path)?;
        self.remove_segments(path.segments(), options)
    }

    /// Empties the mapping and resets the timestamps. The frozen flag,
    /// metadata and nested-path checking flag are kept.
    pub fn clear(&mut self) -> ContainerResult<()> {
        self.ensure_writable("", SetOptions::default())?;
        self.entries.clear();
        let next = self
            .timestamps
            .modified_at
            .max(self.timestamps.last_accessed_at)
            .tick();
        self.timestamps = Timestamps::at(next);
        Ok(())
    }

    fn ensure_writable(&self, path: &str, options: SetOptions) -> ContainerResult<()> {
        if self.frozen && !options.ignore_frozen {
            debug!(path, "Rejected write to frozen container");
            return Err(ContainerError::frozen(format!("container (writing {path:?})")));
        }
        Ok(())
    }

    fn write_value(
        &mut self,
        segments: &[String],
        value: Value,
        options: SetOptions,
    ) -> ContainerResult<()> {
        self.ensure_writable(&segments.join("."), options)?;
        let (first, rest) = segments
            .split_first()
            .ok_or_else(|| ContainerError::InvalidPath(String::new()))?;

        if rest.is_empty() {
            match self.entries.get_mut(first) {
                Some(Node::Leaf(item)) => item.set_value(value)?,
                _ => {
                    self.entries.insert(first.clone(), Node::leaf(value));
                }
            }
        } else {
            let into_payload = matches!(
                self.entries.get(first),
                Some(Node::Leaf(item)) if json::descends_into(item.peek(), &rest[0])
            );
            if into_payload {
                if let Some(Node::Leaf(item)) = self.entries.get_mut(first) {
                    item.set_value_at(rest, value)?;
                }
            } else {
                self.child_container(first).write_value(rest, value, options)?;
            }
        }

        self.timestamps.touch_modified();
        Ok(())
    }

    fn place_node(
        &mut self,
        segments: &[String],
        node: Node,
        options: SetOptions,
    ) -> ContainerResult<()> {
        self.ensure_writable(&segments.join("."), options)?;
        let (first, rest) = segments
            .split_first()
            .ok_or_else(|| ContainerError::InvalidPath(String::new()))?;

        if rest.is_empty() {
            let mut node = node;
            if let Node::Container(child) = &mut node {
                child.set_enhanced_nested_path_checking(self.enhanced_nested_path_checking);
            }
            self.entries.insert(first.clone(), node);
        } else {
            self.child_container(first).place_node(rest, node, options)?;
        }

        self.timestamps.touch_modified();
        Ok(())
    }

    fn child_container(&mut self, key: &str) -> &mut ContextContainer {
        let enhanced = self.enhanced_nested_path_checking;
        let fresh = || {
            Node::Container(ContextContainer::new().with_enhanced_nested_path_checking(enhanced))
        };
        let slot = self.entries.entry(key.to_string()).or_insert_with(fresh);
        if !slot.is_container() {
            *slot = fresh();
        }
        match slot {
            Node::Container(child) => child,
            Node::Leaf(_) => unreachable!("slot was just replaced by a container"),
        }
    }

    fn remove_segments(
        &mut self,
        segments: &[String],
        options: SetOptions,
    ) -> ContainerResult<bool> {
        self.ensure_writable(&segments.join("."), options)?;
        let Some((first, rest)) = segments.split_first() else {
            return Ok(false);
        };
        let removed = if rest.is_empty() {
            self.entries.shift_remove(first).is_some()
        } else {
            match self.entries.get_mut(first) {
                Some(Node::Container(child)) => child.remove_segments(rest, options)?,
                Some(Node::Leaf(item)) => item.remove_value_at(rest)?.is_some(),
                None => false,
            }
        };
        if removed {
            self.timestamps.touch_modified();
        }
        Ok(removed)
    }

    // ── Structure ────────────────────────────────────────────────

    /// Number of top-level keys.
    #[must_use]
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.entries.iter()
    }

    /// The top-level node stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Every leaf item with its full path, depth-first in insertion order.
    #[must_use]
    pub fn leaves(&self) -> Vec<(DotPath, &ContextItem)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut Vec::new(), &mut out);
        out
    }

    fn collect_leaves<'a>(
        &'a self,
        prefix: &mut Vec<String>,
        out: &mut Vec<(DotPath, &'a ContextItem)>,
    ) {
        for (key, node) in &self.entries {
            prefix.push(key.clone());
            match node {
                Node::Leaf(item) => {
                    if let Ok(path) = DotPath::from_segments(prefix.iter().cloned()) {
                        out.push((path, item));
                    }
                }
                Node::Container(child) => child.collect_leaves(prefix, out),
            }
            prefix.pop();
        }
    }

    /// The plain JSON rendering of the whole tree.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(key, node)| (key.clone(), node.to_value()))
            .collect();
        Value::Object(map)
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[must_use]
    pub fn enhanced_nested_path_checking(&self) -> bool {
        self.enhanced_nested_path_checking
    }

    #[must_use]
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    #[must_use]
    pub fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }

    #[must_use]
    pub fn timestamp(&self, field: TimestampField) -> HybridTimestamp {
        self.timestamps.get(field)
    }
}

impl Default for ContextContainer {
    fn default() -> Self {
        Self::new()
    }
}
