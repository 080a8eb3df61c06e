//! A single value slot with timestamps and an optional frozen flag.

use crate::error::{ContainerError, ContainerResult};
use crate::json;
use contextsync_types::{HybridTimestamp, TimestampField, Timestamps};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// An opaque value slot.
///
/// Frozen items reject every write through [`ContextItem::set_value`]; the
/// flag is fixed at construction. Reads through [`ContextItem::value`]
/// advance `last_accessed_at`, reads through [`ContextItem::peek`] do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextItem {
    value: Value,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    frozen: bool,
    #[serde(flatten)]
    timestamps: Timestamps,
}

impl ContextItem {
    /// Creates a mutable item.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value,
            metadata: Value::Null,
            frozen: false,
            timestamps: Timestamps::now(),
        }
    }

    /// Creates a frozen item.
    #[must_use]
    pub fn frozen(value: Value) -> Self {
        Self {
            frozen: true,
            ..Self::new(value)
        }
    }

    /// Attaches a free-form metadata tag (e.g. `{"type": "schema"}`).
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Replaces all three timestamps (for replay or testing).
    #[must_use]
    pub fn with_timestamps(mut self, timestamps: Timestamps) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Returns the payload and records the access.
    pub fn value(&mut self) -> &Value {
        self.timestamps.touch_accessed();
        &self.value
    }

    /// Returns the payload without touching `last_accessed_at`.
    #[must_use]
    pub fn peek(&self) -> &Value {
        &self.value
    }

    /// Replaces the payload.
    pub fn set_value(&mut self, value: Value) -> ContainerResult<()> {
        self.ensure_mutable()?;
        self.value = value;
        self.timestamps.touch_modified();
        Ok(())
    }

    fn ensure_mutable(&self) -> ContainerResult<()> {
        if self.frozen {
            debug!(metadata = %self.metadata, "Rejected write to frozen item");
            return Err(ContainerError::frozen("item"));
        }
        Ok(())
    }

    /// Looks up a dot-path inside the payload.
    #[must_use]
    pub fn value_at(&self, segments: &[String]) -> Option<&Value> {
        json::lookup(&self.value, segments)
    }

    /// Writes inside the payload at `segments`, creating objects as needed.
    pub fn set_value_at(&mut self, segments: &[String], value: Value) -> ContainerResult<()> {
        self.ensure_mutable()?;
        json::insert(&mut self.value, segments, value);
        self.timestamps.touch_modified();
        Ok(())
    }

    /// Removes a dot-path inside the payload.
    pub fn remove_value_at(&mut self, segments: &[String]) -> ContainerResult<Option<Value>> {
        self.ensure_mutable()?;
        let removed = json::remove(&mut self.value, segments);
        if removed.is_some() {
            self.timestamps.touch_modified();
        }
        Ok(removed)
    }

    /// Resets the payload to `null`.
    pub fn clear(&mut self) -> ContainerResult<()> {
        self.set_value(Value::Null)
    }

    /// Owner-initiated replacement that ignores the frozen flag.
    ///
    /// Only the code that constructed the item may call this; a `Context`
    /// uses it from `reinitialize` and never hands out `&mut` access to its
    /// frozen components.
    pub fn reinitialize(&mut self, value: Value) {
        self.value = value;
        self.timestamps = Timestamps::now();
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
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

    #[must_use]
    pub fn created_at(&self) -> HybridTimestamp {
        self.timestamps.created_at
    }

    #[must_use]
    pub fn modified_at(&self) -> HybridTimestamp {
        self.timestamps.modified_at
    }

    #[must_use]
    pub fn last_accessed_at(&self) -> HybridTimestamp {
        self.timestamps.last_accessed_at
    }
}

impl Default for ContextItem {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}
