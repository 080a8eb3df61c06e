//! A container entry: either a leaf item or a nested container.

use crate::container::ContextContainer;
use crate::item::ContextItem;
use contextsync_types::{HybridTimestamp, TimestampField, Timestamps};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry in a [`ContextContainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Node {
    Leaf(ContextItem),
    Container(ContextContainer),
}

impl Node {
    /// A fresh mutable leaf holding `value`.
    #[must_use]
    pub fn leaf(value: Value) -> Self {
        Node::Leaf(ContextItem::new(value))
    }

    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Node::Container(_))
    }

    #[must_use]
    pub fn as_item(&self) -> Option<&ContextItem> {
        match self {
            Node::Leaf(item) => Some(item),
            Node::Container(_) => None,
        }
    }

    #[must_use]
    pub fn as_container(&self) -> Option<&ContextContainer> {
        match self {
            Node::Container(c) => Some(c),
            Node::Leaf(_) => None,
        }
    }

    pub fn as_container_mut(&mut self) -> Option<&mut ContextContainer> {
        match self {
            Node::Container(c) => Some(c),
            Node::Leaf(_) => None,
        }
    }

    #[must_use]
    pub fn timestamps(&self) -> &Timestamps {
        match self {
            Node::Leaf(item) => item.timestamps(),
            Node::Container(c) => c.timestamps(),
        }
    }

    #[must_use]
    pub fn timestamp(&self, field: TimestampField) -> HybridTimestamp {
        self.timestamps().get(field)
    }

    /// The plain JSON rendering of this node.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Node::Leaf(item) => item.peek().clone(),
            Node::Container(c) => c.to_value(),
        }
    }

    /// True if both nodes render to the same plain JSON.
    #[must_use]
    pub fn same_content(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Leaf(a), Node::Leaf(b)) => a.peek() == b.peek(),
            _ => self.to_value() == other.to_value(),
        }
    }

    pub(crate) fn touch_accessed(&mut self) {
        match self {
            Node::Leaf(item) => {
                let _ = item.value();
            }
            Node::Container(c) => c.touch_accessed(),
        }
    }
}

impl From<ContextItem> for Node {
    fn from(item: ContextItem) -> Self {
        Node::Leaf(item)
    }
}

impl From<ContextContainer> for Node {
    fn from(container: ContextContainer) -> Self {
        Node::Container(container)
    }
}
