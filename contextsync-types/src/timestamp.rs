//! Hybrid Logical Clock timestamps for node bookkeeping.
//!
//! Every item and container records when it was created, last modified and
//! last read. Modifications always `tick()` from the previous value so two
//! writes landing in the same millisecond are still strictly ordered, which
//! is what the newer-wins merge strategy relies on.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

fn wall_clock_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// A Hybrid Logical Clock timestamp.
///
/// Consists of:
/// - `wall_time`: Milliseconds since Unix epoch (physical component)
/// - `logical`: Logical counter for events at the same wall time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HybridTimestamp {
    /// Physical time component (milliseconds since Unix epoch).
    wall_time: u64,
    /// Logical counter for ordering events at the same wall time.
    logical: u32,
}

impl HybridTimestamp {
    /// Creates a new timestamp at the current time.
    #[must_use]
    pub fn now() -> Self {
        Self {
            wall_time: wall_clock_millis(),
            logical: 0,
        }
    }

    /// Creates a timestamp from components.
    #[must_use]
    pub const fn new(wall_time: u64, logical: u32) -> Self {
        Self { wall_time, logical }
    }

    /// Creates a timestamp at the given wall time with a zero logical counter.
    #[must_use]
    pub const fn from_millis(wall_time: u64) -> Self {
        Self::new(wall_time, 0)
    }

    /// Returns the wall time component.
    #[must_use]
    pub const fn wall_time(&self) -> u64 {
        self.wall_time
    }

    /// Returns the logical counter.
    #[must_use]
    pub const fn logical(&self) -> u32 {
        self.logical
    }

    /// Generates the next timestamp, strictly greater than `self`.
    #[must_use]
    pub fn tick(&self) -> Self {
        let now = wall_clock_millis();
        if now > self.wall_time {
            Self {
                wall_time: now,
                logical: 0,
            }
        } else {
            Self {
                wall_time: self.wall_time,
                logical: self.logical.saturating_add(1),
            }
        }
    }

    /// Returns true if this timestamp is strictly before the other.
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self < other
    }

    /// Returns true if this timestamp is strictly after the other.
    #[must_use]
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }
}

impl Default for HybridTimestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl PartialOrd for HybridTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HybridTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.wall_time.cmp(&other.wall_time) {
            Ordering::Equal => self.logical.cmp(&other.logical),
            other => other,
        }
    }
}

/// Selects which of the three bookkeeping timestamps a comparison or merge
/// looks at (`compareBy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimestampField {
    CreatedAt,
    #[default]
    ModifiedAt,
    LastAccessedAt,
}

/// The created / modified / last-accessed triple carried by every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timestamps {
    pub created_at: HybridTimestamp,
    pub modified_at: HybridTimestamp,
    pub last_accessed_at: HybridTimestamp,
}

impl Timestamps {
    /// All three timestamps set to the current time.
    #[must_use]
    pub fn now() -> Self {
        Self::at(HybridTimestamp::now())
    }

    /// All three timestamps set to `ts`.
    #[must_use]
    pub const fn at(ts: HybridTimestamp) -> Self {
        Self {
            created_at: ts,
            modified_at: ts,
            last_accessed_at: ts,
        }
    }

    /// Returns the timestamp selected by `field`.
    #[must_use]
    pub const fn get(&self, field: TimestampField) -> HybridTimestamp {
        match field {
            TimestampField::CreatedAt => self.created_at,
            TimestampField::ModifiedAt => self.modified_at,
            TimestampField::LastAccessedAt => self.last_accessed_at,
        }
    }

    /// Advances `modified_at` (and `last_accessed_at` with it).
    pub fn touch_modified(&mut self) {
        let next = self.modified_at.max(self.last_accessed_at).tick();
        self.modified_at = next;
        self.last_accessed_at = next;
    }

    /// Advances `last_accessed_at` only.
    pub fn touch_accessed(&mut self) {
        self.last_accessed_at = self.last_accessed_at.tick();
    }
}

impl Default for Timestamps {
    fn default() -> Self {
        Self::now()
    }
}
