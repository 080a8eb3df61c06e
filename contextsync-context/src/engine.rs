//! Pull and push against peer contexts.
//!
//! Peers are only ever touched one hop away: a pull copies each listed
//! peer's content into this context and stops there, it never asks the peer
//! to pull from its own peers.

use crate::config::ErrorPolicy;
use crate::context::Context;
use crate::error::{ContextError, ContextResult};
use crate::peer::PeerRef;
use contextsync_container::Value;
use contextsync_merge::{SyncOptions, SyncResult, Synchronizer};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Why a pull did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// The previous pull was less than one cooldown window ago.
    Cooldown,
}

/// Outcome of a pull or push across all peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerSyncReport {
    pub success: bool,
    pub reason: Option<SkipReason>,
    pub peers_synced: usize,
    pub items_processed: usize,
    /// Failures swallowed under `Warn` or `Silent` policies.
    pub errors: Vec<String>,
}

impl PeerSyncReport {
    fn started() -> Self {
        Self {
            success: true,
            reason: None,
            peers_synced: 0,
            items_processed: 0,
            errors: Vec::new(),
        }
    }

    fn skipped(reason: SkipReason) -> Self {
        Self {
            success: false,
            reason: Some(reason),
            ..Self::started()
        }
    }

    #[must_use]
    pub fn was_skipped(&self) -> bool {
        self.reason.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Pull,
    Push,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Pull => "pull",
            Direction::Push => "push",
        }
    }
}

fn check(peer: &PeerRef, result: SyncResult) -> ContextResult<usize> {
    if result.success {
        Ok(result.items_processed)
    } else {
        Err(ContextError::sync(peer.id(), result.errors.join("; ")))
    }
}

impl Context {
    /// Copies content from peers into this context.
    ///
    /// Uses `pull_from` when given, otherwise the configured pull peers. With
    /// `item_path` only that `component.path` is copied. Returns a skipped
    /// report without touching any peer while the cooldown is running.
    pub fn pull(
        &mut self,
        pull_from: Option<&[PeerRef]>,
        item_path: Option<&str>,
        options: &SyncOptions,
    ) -> ContextResult<PeerSyncReport> {
        let now = Instant::now();
        if self.cooldown.is_cooling(now) {
            let remaining_ms =
                u64::try_from(self.cooldown.remaining(now).as_millis()).unwrap_or(u64::MAX);
            debug!(context = %self.id, remaining_ms, "Pull skipped during cooldown");
            return Ok(PeerSyncReport::skipped(SkipReason::Cooldown));
        }
        self.cooldown.mark(now);

        let peers =
            pull_from.map_or_else(|| self.operations.pull_from.clone(), <[PeerRef]>::to_vec);
        let policy = self.operations.error_handling.on_pull_error;
        let mut report = PeerSyncReport::started();
        let mut failure = None;
        let own_id = self.id;

        for peer in peers.iter().filter(|p| p.id() != own_id) {
            match self.pull_one(peer, item_path, options) {
                Ok(processed) => {
                    report.peers_synced += 1;
                    report.items_processed += processed;
                }
                Err(err) => {
                    if let Err(err) = self.absorb(Direction::Pull, policy, err, &mut report) {
                        failure = Some(err);
                        break;
                    }
                }
            }
        }

        self.metrics.record_pull(now.elapsed());
        debug!(
            context = %self.id,
            peers = report.peers_synced,
            items = report.items_processed,
            item_path = ?item_path,
            "Pull complete"
        );
        failure.map_or(Ok(report), Err)
    }

    /// Copies this context's content into every push peer. Not rate limited.
    pub fn push(
        &mut self,
        item_path: Option<&str>,
        options: &SyncOptions,
    ) -> ContextResult<PeerSyncReport> {
        let started = Instant::now();
        let peers = self.operations.push_to.clone();
        let policy = self.operations.error_handling.on_push_error;
        let mut report = PeerSyncReport::started();
        let mut failure = None;
        let own_id = self.id;

        for peer in peers.iter().filter(|p| p.id() != own_id) {
            match self.push_one(peer, item_path, options) {
                Ok(processed) => {
                    report.peers_synced += 1;
                    report.items_processed += processed;
                }
                Err(err) => {
                    if let Err(err) = self.absorb(Direction::Push, policy, err, &mut report) {
                        failure = Some(err);
                        break;
                    }
                }
            }
        }

        self.metrics.record_push(started.elapsed());
        debug!(
            context = %self.id,
            peers = report.peers_synced,
            items = report.items_processed,
            item_path = ?item_path,
            "Push complete"
        );
        failure.map_or(Ok(report), Err)
    }

    /// Pulls `item_path` (subject to the cooldown) and then reads it.
    pub fn pull_and_get_item(
        &mut self,
        item_path: &str,
        pull_from: Option<&[PeerRef]>,
        options: Option<&SyncOptions>,
    ) -> ContextResult<Option<Value>> {
        let Some(route) = self.route(item_path) else {
            return Ok(None);
        };
        let defaults = SyncOptions::default();
        let sync_path = route.sync_path();
        self.pull(pull_from, sync_path.as_deref(), options.unwrap_or(&defaults))?;
        Ok(self.read(&route))
    }

    fn pull_one(
        &mut self,
        peer: &PeerRef,
        item_path: Option<&str>,
        options: &SyncOptions,
    ) -> ContextResult<usize> {
        let shared = peer.upgrade()?;
        let guard = peer.read(&shared)?;
        let result = match item_path {
            Some(path) => Synchronizer::copy_item(&*guard, self, path, options),
            None => Synchronizer::copy(&*guard, self, options),
        };
        check(peer, result)
    }

    fn push_one(
        &self,
        peer: &PeerRef,
        item_path: Option<&str>,
        options: &SyncOptions,
    ) -> ContextResult<usize> {
        let shared = peer.upgrade()?;
        let mut guard = peer.write(&shared)?;
        let result = match item_path {
            Some(path) => Synchronizer::copy_item(self, &mut *guard, path, options),
            None => Synchronizer::copy(self, &mut *guard, options),
        };
        check(peer, result)
    }

    fn absorb(
        &self,
        direction: Direction,
        policy: ErrorPolicy,
        err: ContextError,
        report: &mut PeerSyncReport,
    ) -> ContextResult<()> {
        report.success = false;
        match policy {
            ErrorPolicy::Throw => Err(err),
            ErrorPolicy::Warn => {
                warn!(
                    context = %self.id,
                    operation = direction.as_str(),
                    error = %err,
                    "Peer sync failed"
                );
                report.errors.push(err.to_string());
                Ok(())
            }
            ErrorPolicy::Silent => {
                report.errors.push(err.to_string());
                Ok(())
            }
        }
    }
}
