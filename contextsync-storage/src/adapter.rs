//! Persisting contexts through a [`StorageBackend`].

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use contextsync_container::ContextItem;
use contextsync_context::{Context, ContextSnapshot, OperationsParams};
use contextsync_merge::{ChangeDirection, MergeOptions, MergeResult, MergeStrategy};
use contextsync_types::{ComponentKey, DotPath};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Default key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "contextsync";

/// What [`StorageAdapter::store`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOutcome {
    /// Nothing usable was stored; the snapshot was written as is.
    Written,
    /// A stored context was found and merged with the incoming one.
    Merged(MergeResult),
}

/// Stores contexts as tagged snapshots under prefixed keys.
///
/// When a context snapshot already exists under the key, the incoming
/// context is merged into it (incoming as source, stored as target) and the
/// merged result is written back. Anything else under the key is replaced.
///
/// Persisting is owner-initiated, so merge decisions that favour the
/// incoming `schema`, `constants` or `manifest` are written into the stored
/// snapshot even though those components reject ordinary writes.
#[derive(Clone)]
pub struct StorageAdapter {
    backend: Arc<dyn StorageBackend>,
    prefix: String,
    strategy: MergeStrategy,
    merge_options: MergeOptions,
}

impl std::fmt::Debug for StorageAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAdapter")
            .field("prefix", &self.prefix)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl StorageAdapter {
    /// An adapter merging with `MergeNewerWins`.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            strategy: MergeStrategy::MergeNewerWins,
            merge_options: MergeOptions::default(),
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_merge_options(mut self, options: MergeOptions) -> Self {
        self.merge_options = options;
        self
    }

    #[must_use]
    pub fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    fn full_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{key}", self.prefix)
        }
    }

    /// Persists `context` under `key`, merging with a stored context if
    /// there is one.
    pub fn store(&self, key: &str, context: &Context) -> StorageResult<StoreOutcome> {
        self.store_with(key, context, self.strategy)
    }

    /// Like [`StorageAdapter::store`] with an explicit strategy.
    pub fn store_with(
        &self,
        key: &str,
        context: &Context,
        strategy: MergeStrategy,
    ) -> StorageResult<StoreOutcome> {
        let full_key = self.full_key(key);
        let Some(mut stored) = self.load_existing(&full_key)? else {
            let text = context.to_snapshot().to_json_string()?;
            self.backend.set(&full_key, text)?;
            info!(key = %full_key, location = %context.context_location(), "Stored context");
            return Ok(StoreOutcome::Written);
        };

        let mut incoming =
            Context::from_snapshot(context.to_snapshot(), OperationsParams::default())?;
        let mut result = incoming.merge(&mut stored, strategy, &self.merge_options)?;
        if !result.success {
            warn!(
                key = %full_key,
                errors = ?result.errors,
                "Merge with stored context reported errors"
            );
        }
        let mut snapshot = stored.to_snapshot();
        let frozen = if strategy == MergeStrategy::NoAction {
            0
        } else {
            apply_frozen_changes(&incoming, &mut snapshot, &mut result)
        };
        self.backend.set(&full_key, snapshot.to_json_string()?)?;
        info!(
            key = %full_key,
            %strategy,
            processed = result.items_processed,
            frozen,
            "Merged context into stored snapshot"
        );
        Ok(StoreOutcome::Merged(result))
    }

    /// Writes `context` under `key`, discarding whatever was stored.
    pub fn overwrite(&self, key: &str, context: &Context) -> StorageResult<()> {
        let full_key = self.full_key(key);
        self.backend
            .set(&full_key, context.to_snapshot().to_json_string()?)?;
        info!(key = %full_key, "Overwrote stored context");
        Ok(())
    }

    /// The stored snapshot under `key`, if it is a context.
    pub fn load_snapshot(&self, key: &str) -> StorageResult<Option<ContextSnapshot>> {
        let Some(text) = self.backend.get(&self.full_key(key))? else {
            return Ok(None);
        };
        let value: Value = serde_json::from_str(&text)?;
        if !ContextSnapshot::is_context(&value) {
            return Ok(None);
        }
        Ok(Some(ContextSnapshot::from_value(value)?))
    }

    /// Rebuilds the context stored under `key`.
    pub fn load(&self, key: &str, operations: OperationsParams) -> StorageResult<Option<Context>> {
        match self.load_snapshot(key)? {
            Some(snapshot) => Ok(Some(Context::from_snapshot(snapshot, operations)?)),
            None => Ok(None),
        }
    }

    /// Removes whatever is stored under `key`.
    pub fn remove(&self, key: &str) -> StorageResult<bool> {
        self.backend.remove(&self.full_key(key))
    }

    /// Unprefixed keys currently stored by this adapter.
    pub fn keys(&self) -> StorageResult<Vec<String>> {
        let marker = format!("{}:", self.prefix);
        Ok(self
            .backend
            .keys()?
            .into_iter()
            .filter_map(|k| {
                if self.prefix.is_empty() {
                    Some(k)
                } else {
                    k.strip_prefix(&marker).map(str::to_string)
                }
            })
            .collect())
    }

    /// Stored context under `full_key`; non-context values are ignored.
    fn load_existing(&self, full_key: &str) -> StorageResult<Option<Context>> {
        let Some(text) = self.backend.get(full_key)? else {
            return Ok(None);
        };
        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            warn!(key = %full_key, "Replacing unparseable stored value");
            return Ok(None);
        };
        if !ContextSnapshot::is_context(&value) {
            warn!(key = %full_key, "Replacing stored value that is not a context");
            return Ok(None);
        }
        let snapshot = ContextSnapshot::from_value(value)?;
        Ok(Some(Context::from_snapshot(snapshot, OperationsParams::default())?))
    }
}

/// Writes the skipped `into target` changes for frozen components into
/// `snapshot`, marking them applied. Returns the number of components
/// rewritten.
fn apply_frozen_changes(
    incoming: &Context,
    snapshot: &mut ContextSnapshot,
    result: &mut MergeResult,
) -> usize {
    let mut rewritten = 0;
    for key in ComponentKey::ALL.into_iter().filter(ComponentKey::is_frozen) {
        let (slot, winner) = match key {
            ComponentKey::Schema => (&mut snapshot.schema, incoming.schema()),
            ComponentKey::Constants => (&mut snapshot.constants, incoming.constants()),
            ComponentKey::Manifest => (&mut snapshot.manifest, incoming.manifest()),
            _ => continue,
        };

        let mut working = ContextItem::new(slot.peek().clone());
        let mut touched = false;
        for change in result.changes.iter_mut().filter(|c| {
            !c.applied && c.direction == ChangeDirection::IntoTarget && belongs_to(&c.path, key)
        }) {
            let inner = change
                .path
                .strip_prefix(key.as_str())
                .and_then(|rest| rest.strip_prefix('.'));
            let written = match inner {
                None => {
                    working = ContextItem::new(change.value.clone());
                    true
                }
                Some(inner) => DotPath::parse(inner).is_ok_and(|path| {
                    working.set_value_at(path.segments(), change.value.clone()).is_ok()
                }),
            };
            if written {
                change.applied = true;
                result.statistics.skipped = result.statistics.skipped.saturating_sub(1);
                result.statistics.updated += 1;
                touched = true;
            }
        }

        if touched {
            *slot = ContextItem::frozen(working.peek().clone())
                .with_metadata(slot.metadata().clone())
                .with_timestamps(*winner.timestamps());
            rewritten += 1;
        }
    }
    rewritten
}

fn belongs_to(path: &str, key: ComponentKey) -> bool {
    path.strip_prefix(key.as_str())
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}
