//! The seven named components every context is built from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the seven named sub-stores of a context.
///
/// `Schema`, `Constants` and `Manifest` are frozen items; the other four are
/// mutable containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKey {
    Schema,
    Constants,
    Manifest,
    Flags,
    State,
    Data,
    Settings,
}

impl ComponentKey {
    /// All components in canonical order.
    pub const ALL: [ComponentKey; 7] = [
        ComponentKey::Schema,
        ComponentKey::Constants,
        ComponentKey::Manifest,
        ComponentKey::Flags,
        ComponentKey::State,
        ComponentKey::Data,
        ComponentKey::Settings,
    ];

    /// The key as it appears in dot-paths and snapshots.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ComponentKey::Schema => "schema",
            ComponentKey::Constants => "constants",
            ComponentKey::Manifest => "manifest",
            ComponentKey::Flags => "flags",
            ComponentKey::State => "state",
            ComponentKey::Data => "data",
            ComponentKey::Settings => "settings",
        }
    }

    /// Position in [`ComponentKey::ALL`].
    #[must_use]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Frozen components reject every public write.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        matches!(
            self,
            ComponentKey::Schema | ComponentKey::Constants | ComponentKey::Manifest
        )
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKey {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| crate::Error::UnknownComponent(s.to_string()))
    }
}
