//! Plain persistence form of a context.

use crate::config::{NamingConvention, OperationsParams};
use crate::context::Context;
use crate::error::{ContextError, ContextResult};
use crate::metrics::{PerformanceMetrics, PullCooldown};
use chrono::{DateTime, Utc};
use contextsync_container::{ContextContainer, ContextItem};
use contextsync_types::ContextId;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Discriminant carried by every serialized context.
pub const SNAPSHOT_KIND: &str = "context";

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A serialized context.
///
/// Components keep their per-entry timestamps so a restored context can
/// still take part in newer-wins merges. Storage collaborators decide
/// between merging and replacing by checking `kind` alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub kind: String,
    pub version: u32,
    pub context_location: String,
    #[serde(default)]
    pub naming_convention: Option<NamingConvention>,
    #[serde(default)]
    pub enhanced_nested_path_checking: bool,
    pub data: ContextContainer,
    pub settings: ContextContainer,
    pub schema: ContextItem,
    pub constants: ContextItem,
    pub manifest: ContextItem,
    pub flags: ContextContainer,
    pub state: ContextContainer,
    #[serde(default)]
    pub root: ContextContainer,
    /// Unix milliseconds at which the snapshot was taken.
    pub timestamp: i64,
}

impl ContextSnapshot {
    /// True if `value` carries the context discriminant.
    #[must_use]
    pub fn is_context(value: &Value) -> bool {
        value.get("kind").and_then(Value::as_str) == Some(SNAPSHOT_KIND)
    }

    /// Parses a snapshot, rejecting anything not tagged as a context.
    pub fn from_json_str(json: &str) -> ContextResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> ContextResult<Self> {
        if !Self::is_context(&value) {
            return Err(ContextError::Validation(
                "stored value is not a context snapshot".to_string(),
            ));
        }
        let snapshot: Self = serde_json::from_value(value)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(ContextError::Configuration(format!(
                "snapshot version {} is newer than supported version {SNAPSHOT_VERSION}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    pub fn to_json_string(&self) -> ContextResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// When the snapshot was taken.
    #[must_use]
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Component values without bookkeeping.
    #[must_use]
    pub fn to_plain_value(&self) -> Value {
        json!({
            "data": self.data.to_value(),
            "settings": self.settings.to_value(),
            "schema": self.schema.peek(),
            "constants": self.constants.peek(),
            "manifest": self.manifest.peek(),
            "flags": self.flags.to_value(),
            "state": self.state.to_value(),
            "timestamp": self.timestamp,
        })
    }
}

impl Context {
    /// Captures every component.
    #[must_use]
    pub fn to_snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            kind: SNAPSHOT_KIND.to_string(),
            version: SNAPSHOT_VERSION,
            context_location: self.context_location.clone(),
            naming_convention: Some(self.naming.clone()),
            enhanced_nested_path_checking: self.enhanced_nested_path_checking,
            data: self.data.clone(),
            settings: self.settings.clone(),
            schema: self.schema.clone(),
            constants: self.constants.clone(),
            manifest: self.manifest.clone(),
            flags: self.flags.clone(),
            state: self.state.clone(),
            root: self.root.clone(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Rebuilds a context from a snapshot. The result gets a fresh id and
    /// fresh metrics.
    pub fn from_snapshot(
        snapshot: ContextSnapshot,
        operations: OperationsParams,
    ) -> ContextResult<Self> {
        if snapshot.kind != SNAPSHOT_KIND {
            return Err(ContextError::Validation(format!(
                "expected a {SNAPSHOT_KIND:?} snapshot, found {:?}",
                snapshot.kind
            )));
        }
        if snapshot.context_location.trim().is_empty() {
            return Err(ContextError::Configuration(
                "contextLocation must not be empty".to_string(),
            ));
        }
        let all_frozen = snapshot.schema.is_frozen()
            && snapshot.constants.is_frozen()
            && snapshot.manifest.is_frozen();
        if !all_frozen {
            return Err(ContextError::Validation(
                "schema, constants and manifest must be frozen".to_string(),
            ));
        }

        let enhanced = snapshot.enhanced_nested_path_checking;
        let naming = snapshot
            .naming_convention
            .unwrap_or_else(crate::config::default_naming_convention);
        let naming_value = serde_json::to_value(&naming)?;
        let container = |c: ContextContainer| c.with_enhanced_nested_path_checking(enhanced);

        Ok(Self {
            id: ContextId::new(),
            context_location: snapshot.context_location,
            schema: snapshot.schema,
            constants: snapshot.constants,
            manifest: snapshot.manifest,
            flags: container(snapshot.flags),
            state: container(snapshot.state),
            data: container(snapshot.data),
            settings: container(snapshot.settings),
            root: container(snapshot.root),
            naming_convention: ContextItem::frozen(naming_value)
                .with_metadata(json!({ "type": "namingConvention" })),
            naming,
            enhanced_nested_path_checking: enhanced,
            operations,
            metrics: PerformanceMetrics::default(),
            cooldown: PullCooldown::default(),
        })
    }
}
