//! Building contexts for well-known locations.

use crate::error::{StorageError, StorageResult};
use contextsync_context::{Context, ContextConfig};
use std::fmt;
use std::str::FromStr;

/// Where a context lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContextLocation {
    /// Long-lived storage shared by every session.
    Local,
    /// Storage scoped to the current session.
    Session,
    /// A module's private context.
    Module(String),
}

impl fmt::Display for ContextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextLocation::Local => f.write_str("local"),
            ContextLocation::Session => f.write_str("session"),
            ContextLocation::Module(id) => write!(f, "module:{id}"),
        }
    }
}

impl FromStr for ContextLocation {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(ContextLocation::Local),
            "session" => Ok(ContextLocation::Session),
            _ => match s.strip_prefix("module:") {
                Some(id) if !id.is_empty() => Ok(ContextLocation::Module(id.to_string())),
                _ => Err(StorageError::Configuration(format!(
                    "unknown context location {s:?}"
                ))),
            },
        }
    }
}

/// Creates contexts from a template configuration.
///
/// The template's `contextLocation` is overwritten with the requested
/// location; everything else is copied into each new context.
#[derive(Debug, Clone, Default)]
pub struct ContextFactory {
    template: ContextConfig,
}

impl ContextFactory {
    #[must_use]
    pub fn new(template: ContextConfig) -> Self {
        Self { template }
    }

    /// A factory whose template is parsed from JSON.
    pub fn from_json_str(json: &str) -> StorageResult<Self> {
        Ok(Self::new(ContextConfig::from_json_str(json)?))
    }

    #[must_use]
    pub fn template(&self) -> &ContextConfig {
        &self.template
    }

    /// A fresh context at `location`.
    pub fn create(&self, location: &ContextLocation) -> StorageResult<Context> {
        self.create_at(&location.to_string())
    }

    /// A fresh context at a free-form location string.
    pub fn create_at(&self, location: &str) -> StorageResult<Context> {
        let mut config = self.template.clone();
        config.initialization_params.context_location = Some(location.to_string());
        Ok(Context::with_config(config)?)
    }
}
