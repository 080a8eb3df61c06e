//! Construction and operations configuration.
//!
//! Every type here deserializes from camelCase JSON so a host can hand a
//! whole configuration over as text. Defaults are built fresh per call.

use crate::error::{ContextError, ContextResult};
use crate::peer::PeerRef;
use contextsync_types::ComponentKey;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::time::Duration;

/// Default pull cooldown window in milliseconds.
pub const DEFAULT_PULL_COOLDOWN_MS: u64 = 1000;

/// Location used when none is configured.
pub const DEFAULT_CONTEXT_LOCATION: &str = "default";

/// Logical name to component mapping.
pub type NamingConvention = IndexMap<String, ComponentKey>;

/// The identity naming convention: every component under its own name.
#[must_use]
pub fn default_naming_convention() -> NamingConvention {
    ComponentKey::ALL
        .into_iter()
        .map(|key| (key.as_str().to_string(), key))
        .collect()
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Initial component values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitializationParams {
    pub context_schema: Value,
    pub naming_convention: NamingConvention,
    pub context_location: Option<String>,
    pub constants: Value,
    pub manifest: Value,
    pub flags: Value,
    pub state: Value,
    pub data: Value,
    pub settings: Value,
}

impl Default for InitializationParams {
    fn default() -> Self {
        Self {
            context_schema: empty_object(),
            naming_convention: default_naming_convention(),
            context_location: None,
            constants: empty_object(),
            manifest: empty_object(),
            flags: empty_object(),
            state: empty_object(),
            data: empty_object(),
            settings: empty_object(),
        }
    }
}

impl InitializationParams {
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.context_location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: Value) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_constants(mut self, constants: Value) -> Self {
        self.constants = constants;
        self
    }

    #[must_use]
    pub fn with_manifest(mut self, manifest: Value) -> Self {
        self.manifest = manifest;
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.context_schema = schema;
        self
    }

    /// Checks the location and naming convention.
    pub fn validate(&self) -> ContextResult<()> {
        if self
            .context_location
            .as_deref()
            .is_some_and(|location| location.trim().is_empty())
        {
            return Err(ContextError::Configuration(
                "contextLocation must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (name, key) in &self.naming_convention {
            if name.is_empty() || name.contains('.') {
                return Err(ContextError::Configuration(format!(
                    "invalid naming convention name {name:?}"
                )));
            }
            if !seen.insert(*key) {
                return Err(ContextError::Configuration(format!(
                    "naming convention maps more than one name to {key}"
                )));
            }
        }
        Ok(())
    }
}

/// Fresh default initialization parameters.
#[must_use]
pub fn default_initialization_params() -> InitializationParams {
    InitializationParams::default()
}

/// What to do when a pull, push or validation step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Return the error to the caller.
    Throw,
    /// Log at warn level and carry on.
    Warn,
    /// Carry on without logging.
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorHandling {
    pub on_pull_error: ErrorPolicy,
    pub on_push_error: ErrorPolicy,
    pub on_validation_error: ErrorPolicy,
}

impl Default for ErrorHandling {
    fn default() -> Self {
        Self {
            on_pull_error: ErrorPolicy::Warn,
            on_push_error: ErrorPolicy::Warn,
            on_validation_error: ErrorPolicy::Throw,
        }
    }
}

/// Automatic pull/push behaviour and the peers involved.
///
/// Peer lists hold non-owning references and are skipped by serde.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationsParams {
    pub always_pull_before_getting: bool,
    pub always_pull_before_setting: bool,
    pub always_push_after_setting: bool,
    #[serde(skip)]
    pub pull_from: Vec<PeerRef>,
    #[serde(skip)]
    pub push_to: Vec<PeerRef>,
    pub error_handling: ErrorHandling,
}

impl OperationsParams {
    #[must_use]
    pub fn pull_from(mut self, peer: PeerRef) -> Self {
        self.pull_from.push(peer);
        self
    }

    #[must_use]
    pub fn push_to(mut self, peer: PeerRef) -> Self {
        self.push_to.push(peer);
        self
    }

    #[must_use]
    pub fn with_error_handling(mut self, error_handling: ErrorHandling) -> Self {
        self.error_handling = error_handling;
        self
    }
}

/// Fresh default operations parameters: no automatic pull or push.
#[must_use]
pub fn default_operations_params() -> OperationsParams {
    OperationsParams::default()
}

/// A whole construction configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextConfig {
    pub initialization_params: InitializationParams,
    pub operations_params: OperationsParams,
    pub enhanced_nested_path_checking: bool,
    pub pull_cooldown_ms: Option<u64>,
}

impl ContextConfig {
    /// Parses a configuration from JSON and validates it.
    pub fn from_json_str(json: &str) -> ContextResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| ContextError::Configuration(err.to_string()))?;
        config.initialization_params.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn pull_cooldown(&self) -> Duration {
        Duration::from_millis(self.pull_cooldown_ms.unwrap_or(DEFAULT_PULL_COOLDOWN_MS))
    }
}
