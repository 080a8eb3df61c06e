//! A borrowed view of one context component: an item or a container.

use crate::container::ContextContainer;
use crate::item::ContextItem;
use contextsync_types::{DotPath, HybridTimestamp, TimestampField, Timestamps};
use serde_json::Value;

/// Read-only view of the storage behind one named context component.
///
/// Frozen components (`schema`, `constants`, `manifest`) are items; the
/// rest are containers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComponentRef<'a> {
    Item(&'a ContextItem),
    Container(&'a ContextContainer),
}

impl<'a> ComponentRef<'a> {
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        match self {
            ComponentRef::Item(item) => item.is_frozen(),
            ComponentRef::Container(c) => c.is_frozen(),
        }
    }

    #[must_use]
    pub fn as_item(&self) -> Option<&'a ContextItem> {
        match *self {
            ComponentRef::Item(item) => Some(item),
            ComponentRef::Container(_) => None,
        }
    }

    #[must_use]
    pub fn as_container(&self) -> Option<&'a ContextContainer> {
        match *self {
            ComponentRef::Container(c) => Some(c),
            ComponentRef::Item(_) => None,
        }
    }

    #[must_use]
    pub fn timestamps(&self) -> &'a Timestamps {
        match *self {
            ComponentRef::Item(item) => item.timestamps(),
            ComponentRef::Container(c) => c.timestamps(),
        }
    }

    #[must_use]
    pub fn timestamp(&self, field: TimestampField) -> HybridTimestamp {
        self.timestamps().get(field)
    }

    /// Number of top-level entries (keys of an object payload for items).
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            ComponentRef::Item(item) => item.peek().as_object().map_or(0, |m| m.len()),
            ComponentRef::Container(c) => c.size(),
        }
    }

    /// Plain JSON rendering of the whole component.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            ComponentRef::Item(item) => item.peek().clone(),
            ComponentRef::Container(c) => c.to_value(),
        }
    }

    /// Reads `path` (or the whole component for `None`) without bookkeeping.
    #[must_use]
    pub fn peek(&self, path: Option<&DotPath>) -> Option<Value> {
        match (self, path) {
            (_, None) => Some(self.to_value()),
            (ComponentRef::Item(item), Some(path)) => item.value_at(path.segments()).cloned(),
            (ComponentRef::Container(c), Some(path)) => c.peek_item(&path.to_string()),
        }
    }

    /// True if `path` exists. Item payloads are always navigable.
    #[must_use]
    pub fn has(&self, path: Option<&DotPath>) -> bool {
        match (self, path) {
            (_, None) => true,
            (ComponentRef::Item(item), Some(path)) => item.value_at(path.segments()).is_some(),
            (ComponentRef::Container(c), Some(path)) => c.has_item(&path.to_string()),
        }
    }

    /// Every leaf of the component. An item component is a single leaf at
    /// the component root (`None`).
    #[must_use]
    pub fn leaves(&self) -> Vec<(Option<DotPath>, &'a ContextItem)> {
        match *self {
            ComponentRef::Item(item) => vec![(None, item)],
            ComponentRef::Container(c) => c
                .leaves()
                .into_iter()
                .map(|(path, item)| (Some(path), item))
                .collect(),
        }
    }
}

impl<'a> From<&'a ContextItem> for ComponentRef<'a> {
    fn from(item: &'a ContextItem) -> Self {
        ComponentRef::Item(item)
    }
}

impl<'a> From<&'a ContextContainer> for ComponentRef<'a> {
    fn from(container: &'a ContextContainer) -> Self {
        ComponentRef::Container(container)
    }
}
