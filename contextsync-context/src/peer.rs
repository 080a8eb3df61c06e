//! Non-owning references to peer contexts.

use crate::context::Context;
use crate::error::{ContextError, ContextResult};
use contextsync_types::ContextId;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError, Weak};

/// A context shared between owners and peers.
pub type SharedContext = Arc<RwLock<Context>>;

/// Wraps a context for sharing.
#[must_use]
pub fn share(context: Context) -> SharedContext {
    Arc::new(RwLock::new(context))
}

/// A pull or push peer.
///
/// Holds only a weak handle: listing a context as a peer never keeps it
/// alive. Locks are taken with `try_*` so a peer that is already borrowed
/// (including one currently running its own pull) reports an error instead
/// of blocking.
#[derive(Debug, Clone)]
pub struct PeerRef {
    id: ContextId,
    handle: Weak<RwLock<Context>>,
}

impl PeerRef {
    /// Creates a peer reference. Takes a brief read lock to learn the id.
    pub fn new(shared: &SharedContext) -> ContextResult<Self> {
        let id = match shared.try_read() {
            Ok(guard) => guard.id(),
            Err(err) => return Err(lock_error("unknown", &err)),
        };
        Ok(Self {
            id,
            handle: Arc::downgrade(shared),
        })
    }

    /// Creates a peer reference from a known id without locking.
    #[must_use]
    pub fn with_id(id: ContextId, shared: &SharedContext) -> Self {
        Self {
            id,
            handle: Arc::downgrade(shared),
        }
    }

    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// True while the peer context is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.handle.strong_count() > 0
    }

    pub(crate) fn upgrade(&self) -> ContextResult<SharedContext> {
        self.handle
            .upgrade()
            .ok_or_else(|| ContextError::sync(self.id, "peer context has been dropped"))
    }

    pub(crate) fn read<'a>(
        &self,
        shared: &'a SharedContext,
    ) -> ContextResult<RwLockReadGuard<'a, Context>> {
        shared.try_read().map_err(|err| lock_error(self.id, &err))
    }

    pub(crate) fn write<'a>(
        &self,
        shared: &'a SharedContext,
    ) -> ContextResult<RwLockWriteGuard<'a, Context>> {
        shared.try_write().map_err(|err| lock_error(self.id, &err))
    }
}

fn lock_error<G>(peer: impl ToString, err: &TryLockError<G>) -> ContextError {
    let message = match err {
        TryLockError::WouldBlock => "peer context is busy",
        TryLockError::Poisoned(_) => "peer context lock is poisoned",
    };
    ContextError::sync(peer, message)
}
