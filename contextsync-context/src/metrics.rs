//! Pull/push bookkeeping.

use crate::config::DEFAULT_PULL_COOLDOWN_MS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Counts and cumulative durations of pull and push operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub pull_operations: u64,
    pub total_pull_time: Duration,
    pub last_pull_time: Option<DateTime<Utc>>,
    pub push_operations: u64,
    pub total_push_time: Duration,
    pub last_push_time: Option<DateTime<Utc>>,
}

impl PerformanceMetrics {
    pub(crate) fn record_pull(&mut self, elapsed: Duration) {
        self.pull_operations += 1;
        self.total_pull_time += elapsed;
        self.last_pull_time = Some(Utc::now());
    }

    pub(crate) fn record_push(&mut self, elapsed: Duration) {
        self.push_operations += 1;
        self.total_push_time += elapsed;
        self.last_push_time = Some(Utc::now());
    }

    /// Mean pull duration, if any pull has run.
    #[must_use]
    pub fn average_pull_time(&self) -> Option<Duration> {
        u32::try_from(self.pull_operations)
            .ok()
            .filter(|n| *n > 0)
            .map(|n| self.total_pull_time / n)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Rate limit for pulls.
///
/// A pull started within `window` of the previous one is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullCooldown {
    window: Duration,
    last_pull: Option<Instant>,
}

impl PullCooldown {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_pull: None,
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    #[must_use]
    pub fn last_pull(&self) -> Option<Instant> {
        self.last_pull
    }

    /// True if a pull at `now` would be skipped.
    #[must_use]
    pub fn is_cooling(&self, now: Instant) -> bool {
        self.last_pull
            .is_some_and(|last| now.saturating_duration_since(last) < self.window)
    }

    /// Time left before the next pull is allowed.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.last_pull.map_or(Duration::ZERO, |last| {
            self.window.saturating_sub(now.saturating_duration_since(last))
        })
    }

    pub(crate) fn mark(&mut self, now: Instant) {
        self.last_pull = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_pull = None;
    }
}

impl Default for PullCooldown {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_PULL_COOLDOWN_MS))
    }
}
