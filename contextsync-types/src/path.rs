//! Dot-path addressing (`"data.player.stats.level"`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Keys that older stores renamed with a `_` prefix because they collided
/// with container bookkeeping.
pub const RESERVED_KEYS: [&str; 6] = [
    "value",
    "metadata",
    "size",
    "createdAt",
    "modifiedAt",
    "lastAccessedAt",
];

/// Cap on reserved segments expanded by [`DotPath::reserved_variants`].
pub const MAX_RENAMED_SEGMENTS: usize = 16;

/// Returns true if `key` is one of [`RESERVED_KEYS`].
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// The renamed form of a reserved key (`value` -> `_value`).
#[must_use]
pub fn renamed_reserved_key(key: &str) -> String {
    format!("_{key}")
}

/// A parsed, non-empty dot-path.
///
/// Every segment is non-empty: `""`, `"a..b"` and `".a"` do not parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DotPath {
    segments: Vec<String>,
}

impl DotPath {
    /// Parses a dot-path string.
    pub fn parse(path: &str) -> crate::Result<Self> {
        if path.is_empty() {
            return Err(crate::Error::InvalidPath(path.to_string()));
        }
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(crate::Error::InvalidPath(path.to_string()));
        }
        Ok(Self { segments })
    }

    /// Builds a path from already-split segments.
    pub fn from_segments<I, S>(segments: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return Err(crate::Error::InvalidPath(segments.join(".")));
        }
        Ok(Self { segments })
    }

    /// All segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The first segment.
    #[must_use]
    pub fn first(&self) -> &str {
        &self.segments[0]
    }

    /// The last segment.
    #[must_use]
    pub fn last(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// Everything after the first segment, or `None` for a single-segment path.
    #[must_use]
    pub fn rest(&self) -> Option<DotPath> {
        if self.segments.len() > 1 {
            Some(Self {
                segments: self.segments[1..].to_vec(),
            })
        } else {
            None
        }
    }

    /// Appends a segment, returning the longer path.
    #[must_use]
    pub fn join(&self, segment: &str) -> DotPath {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Every spelling of this path where any subset of reserved segments is
    /// replaced by its `_`-prefixed form. The literal path is not included.
    ///
    /// Only the first [`MAX_RENAMED_SEGMENTS`] reserved segments are
    /// considered; later ones keep their literal spelling.
    #[must_use]
    pub fn reserved_variants(&self) -> Vec<DotPath> {
        let reserved: Vec<usize> = self
            .segments
            .iter()
            .enumerate()
            .filter(|(_, s)| is_reserved_key(s))
            .map(|(i, _)| i)
            .take(MAX_RENAMED_SEGMENTS)
            .collect();

        let mut variants = Vec::new();
        // Bit `n` of the mask selects whether `reserved[n]` is renamed.
        for mask in 1u32..(1u32 << reserved.len()) {
            let mut segments = self.segments.clone();
            for (bit, &index) in reserved.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    segments[index] = renamed_reserved_key(&segments[index]);
                }
            }
            variants.push(Self { segments });
        }
        variants
    }
}

impl fmt::Display for DotPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for DotPath {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DotPath {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DotPath> for String {
    fn from(path: DotPath) -> Self {
        path.to_string()
    }
}
