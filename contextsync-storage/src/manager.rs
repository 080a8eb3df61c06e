//! Registry of live contexts keyed by location.

use crate::adapter::{StorageAdapter, StoreOutcome};
use crate::error::{StorageError, StorageResult};
use crate::factory::ContextFactory;
use contextsync_context::{SharedContext, share};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Owns the live contexts of an application and moves them in and out of
/// storage.
///
/// Contexts are handed out as [`SharedContext`]s; the manager keeps one
/// strong reference per location until [`ExternalContextManager::remove`].
#[derive(Debug)]
pub struct ExternalContextManager {
    contexts: RwLock<HashMap<String, SharedContext>>,
    adapter: StorageAdapter,
    factory: ContextFactory,
}

impl ExternalContextManager {
    #[must_use]
    pub fn new(adapter: StorageAdapter, factory: ContextFactory) -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
            adapter,
            factory,
        }
    }

    #[must_use]
    pub fn adapter(&self) -> &StorageAdapter {
        &self.adapter
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, HashMap<String, SharedContext>>> {
        self.contexts
            .read()
            .map_err(|_| StorageError::Lock("context registry poisoned".to_string()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, HashMap<String, SharedContext>>> {
        self.contexts
            .write()
            .map_err(|_| StorageError::Lock("context registry poisoned".to_string()))
    }

    /// The live context at `location`, if registered.
    pub fn get(&self, location: &str) -> StorageResult<Option<SharedContext>> {
        Ok(self.read()?.get(location).cloned())
    }

    /// The live context at `location`; restores it from storage or creates
    /// it from the factory template if needed.
    pub fn get_or_create(&self, location: &str) -> StorageResult<SharedContext> {
        if let Some(existing) = self.get(location)? {
            return Ok(existing);
        }

        let operations = self.factory.template().operations_params.clone();
        let context = match self.adapter.load(location, operations)? {
            Some(restored) => {
                debug!(location, "Restored context from storage");
                restored
            }
            None => {
                debug!(location, "Created context");
                self.factory.create_at(location)?
            }
        };

        let mut contexts = self.write()?;
        // Another caller may have registered it in the meantime.
        let shared = contexts
            .entry(location.to_string())
            .or_insert_with(|| share(context))
            .clone();
        Ok(shared)
    }

    /// Drops the registry's reference. Storage is untouched.
    pub fn remove(&self, location: &str) -> StorageResult<Option<SharedContext>> {
        Ok(self.write()?.remove(location))
    }

    /// Drops the registry's reference and deletes the stored snapshot.
    pub fn purge(&self, location: &str) -> StorageResult<bool> {
        self.remove(location)?;
        let removed = self.adapter.remove(location)?;
        info!(location, removed, "Purged context");
        Ok(removed)
    }

    /// Writes the live context at `location` to storage.
    pub fn persist(&self, location: &str) -> StorageResult<StoreOutcome> {
        let shared = self
            .get(location)?
            .ok_or_else(|| StorageError::NotFound(location.to_string()))?;
        let context = shared
            .try_read()
            .map_err(|_| StorageError::Lock(format!("context {location} is busy")))?;
        self.adapter.store(location, &context)
    }

    /// Persists every registered context.
    pub fn persist_all(&self) -> StorageResult<usize> {
        let locations = self.locations()?;
        for location in &locations {
            self.persist(location)?;
        }
        Ok(locations.len())
    }

    /// Replaces the live context at `location` with the stored one.
    pub fn restore(&self, location: &str) -> StorageResult<Option<SharedContext>> {
        let operations = self.factory.template().operations_params.clone();
        let Some(context) = self.adapter.load(location, operations)? else {
            return Ok(None);
        };
        let shared = share(context);
        self.write()?.insert(location.to_string(), shared.clone());
        info!(location, "Restored context");
        Ok(Some(shared))
    }

    /// Registered locations, sorted.
    pub fn locations(&self) -> StorageResult<Vec<String>> {
        let mut locations: Vec<String> = self.read()?.keys().cloned().collect();
        locations.sort();
        Ok(locations)
    }
}

impl ExternalContextManager {
    /// Convenience constructor: default factory, given adapter.
    #[must_use]
    pub fn with_adapter(adapter: StorageAdapter) -> Self {
        Self::new(adapter, ContextFactory::default())
    }
}
