//! The context aggregate: seven named components behind one dot-path API.

use crate::config::{
    ContextConfig, DEFAULT_CONTEXT_LOCATION, ErrorPolicy, InitializationParams, NamingConvention,
    OperationsParams,
};
use crate::error::{ContextError, ContextResult};
use crate::metrics::{PerformanceMetrics, PullCooldown};
use contextsync_container::{ComponentRef, ContextContainer, ContextItem, SetOptions, Value};
use contextsync_merge::{
    CompareOptions, CompareResult, Comparison, ComponentTree, MergeAnalysis, MergeOptions,
    MergeResult, MergeStrategy, Merger, SyncOptions,
};
use contextsync_types::{ComponentKey, ContextId, DotPath};
use serde_json::json;
use tracing::{debug, warn};

/// Per-call switches for the automatic pull before and push after a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOverrides {
    pub skip_pull: bool,
    pub skip_push: bool,
}

impl SetOverrides {
    /// Skip both the pre-pull and the post-push.
    #[must_use]
    pub const fn local() -> Self {
        Self {
            skip_pull: true,
            skip_push: true,
        }
    }
}

/// Replacement component values for [`Context::reinitialize`]. `None`
/// keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reinitialize {
    pub context_schema: Option<Value>,
    pub constants: Option<Value>,
    pub manifest: Option<Value>,
    pub flags: Option<Value>,
    pub state: Option<Value>,
    pub data: Option<Value>,
    pub settings: Option<Value>,
}

/// Where a dot-path lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Route {
    /// A named component, optionally with a path inside it.
    Component(ComponentKey, Option<DotPath>),
    /// The context's own top-level mapping.
    Root(DotPath),
}

impl Route {
    /// The canonical `component.path` form used for item-level syncs.
    /// Root paths have none and sync the whole context.
    pub(crate) fn sync_path(&self) -> Option<String> {
        match self {
            Route::Component(key, Some(path)) => Some(format!("{key}.{path}")),
            Route::Component(key, None) => Some(key.to_string()),
            Route::Root(_) => None,
        }
    }
}

/// Structured key-value state made of seven named components.
///
/// `schema`, `constants` and `manifest` are frozen items: no public call can
/// change them except [`Context::reinitialize`]. `flags`, `state`, `data` and
/// `settings` are mutable containers. Paths that do not start with a
/// component name address the context's own top-level mapping.
///
/// Peers listed in the operations parameters are pulled from before reads or
/// writes and pushed to after writes when the corresponding flags are set.
#[derive(Debug)]
pub struct Context {
    pub(crate) id: ContextId,
    pub(crate) context_location: String,
    pub(crate) schema: ContextItem,
    pub(crate) constants: ContextItem,
    pub(crate) manifest: ContextItem,
    pub(crate) flags: ContextContainer,
    pub(crate) state: ContextContainer,
    pub(crate) data: ContextContainer,
    pub(crate) settings: ContextContainer,
    pub(crate) root: ContextContainer,
    pub(crate) naming_convention: ContextItem,
    pub(crate) naming: NamingConvention,
    pub(crate) enhanced_nested_path_checking: bool,
    pub(crate) operations: OperationsParams,
    pub(crate) metrics: PerformanceMetrics,
    pub(crate) cooldown: PullCooldown,
}

fn frozen_item(value: Value, kind: &str) -> ContextItem {
    ContextItem::frozen(value).with_metadata(json!({ "type": kind }))
}

pub(crate) fn component_container(
    key: ComponentKey,
    value: Value,
    enhanced: bool,
) -> ContextResult<ContextContainer> {
    match value {
        Value::Null | Value::Object(_) => Ok(ContextContainer::from_value(value)
            .with_metadata(json!({ "type": key.as_str() }))
            .with_enhanced_nested_path_checking(enhanced)),
        other => Err(ContextError::Configuration(format!(
            "{key} must be an object, got {other}"
        ))),
    }
}

impl Context {
    /// Creates a context with the default pull cooldown and nested-path
    /// checking off.
    pub fn new(init: InitializationParams, operations: OperationsParams) -> ContextResult<Self> {
        Self::build(init, operations, false, PullCooldown::default())
    }

    /// Creates a context from a full configuration.
    pub fn with_config(config: ContextConfig) -> ContextResult<Self> {
        let cooldown = PullCooldown::new(config.pull_cooldown());
        Self::build(
            config.initialization_params,
            config.operations_params,
            config.enhanced_nested_path_checking,
            cooldown,
        )
    }

    /// Creates an empty context at `location`.
    pub fn at_location(location: impl Into<String>) -> ContextResult<Self> {
        Self::new(
            InitializationParams::default().with_location(location),
            OperationsParams::default(),
        )
    }

    fn build(
        init: InitializationParams,
        operations: OperationsParams,
        enhanced: bool,
        cooldown: PullCooldown,
    ) -> ContextResult<Self> {
        init.validate()?;
        let naming_value = serde_json::to_value(&init.naming_convention)?;

        let context = Self {
            id: ContextId::new(),
            context_location: init
                .context_location
                .unwrap_or_else(|| DEFAULT_CONTEXT_LOCATION.to_string()),
            schema: frozen_item(init.context_schema, "schema"),
            constants: frozen_item(init.constants, "constants"),
            manifest: frozen_item(init.manifest, "manifest"),
            flags: component_container(ComponentKey::Flags, init.flags, enhanced)?,
            state: component_container(ComponentKey::State, init.state, enhanced)?,
            data: component_container(ComponentKey::Data, init.data, enhanced)?,
            settings: component_container(ComponentKey::Settings, init.settings, enhanced)?,
            root: ContextContainer::new().with_enhanced_nested_path_checking(enhanced),
            naming_convention: frozen_item(naming_value, "namingConvention"),
            naming: init.naming_convention,
            enhanced_nested_path_checking: enhanced,
            operations,
            metrics: PerformanceMetrics::default(),
            cooldown,
        };
        debug!(
            context = %context.id,
            location = %context.context_location,
            enhanced,
            "Created context"
        );
        Ok(context)
    }

    // ── Accessors ────────────────────────────────────────────────

    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    #[must_use]
    pub fn context_location(&self) -> &str {
        &self.context_location
    }

    #[must_use]
    pub fn schema(&self) -> &ContextItem {
        &self.schema
    }

    #[must_use]
    pub fn constants(&self) -> &ContextItem {
        &self.constants
    }

    #[must_use]
    pub fn manifest(&self) -> &ContextItem {
        &self.manifest
    }

    #[must_use]
    pub fn flags(&self) -> &ContextContainer {
        &self.flags
    }

    #[must_use]
    pub fn state(&self) -> &ContextContainer {
        &self.state
    }

    #[must_use]
    pub fn data(&self) -> &ContextContainer {
        &self.data
    }

    #[must_use]
    pub fn settings(&self) -> &ContextContainer {
        &self.settings
    }

    /// Direct access to a mutable component, bypassing pull and push.
    pub fn component_mut(&mut self, key: ComponentKey) -> Option<&mut ContextContainer> {
        self.container_mut(key)
    }

    /// The top-level mapping addressed by unprefixed paths.
    #[must_use]
    pub fn root(&self) -> &ContextContainer {
        &self.root
    }

    #[must_use]
    pub fn naming_convention(&self) -> &ContextItem {
        &self.naming_convention
    }

    #[must_use]
    pub fn enhanced_nested_path_checking(&self) -> bool {
        self.enhanced_nested_path_checking
    }

    #[must_use]
    pub fn operations_params(&self) -> &OperationsParams {
        &self.operations
    }

    /// Mutable operations parameters, e.g. to register peers after
    /// construction.
    pub fn operations_params_mut(&mut self) -> &mut OperationsParams {
        &mut self.operations
    }

    #[must_use]
    pub fn performance_metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn pull_cooldown(&self) -> &PullCooldown {
        &self.cooldown
    }

    // ── Routing ──────────────────────────────────────────────────

    /// Resolves a component name through the naming convention, falling
    /// back to the canonical component names.
    #[must_use]
    pub fn resolve_component(&self, name: &str) -> Option<ComponentKey> {
        self.naming
            .get(name)
            .copied()
            .or_else(|| name.parse().ok())
    }

    pub(crate) fn route(&self, path: &str) -> Option<Route> {
        let path = DotPath::parse(path).ok()?;
        Some(match self.resolve_component(path.first()) {
            Some(key) => Route::Component(key, path.rest()),
            None => Route::Root(path),
        })
    }

    fn item_mut(&mut self, key: ComponentKey) -> Option<&mut ContextItem> {
        match key {
            ComponentKey::Schema => Some(&mut self.schema),
            ComponentKey::Constants => Some(&mut self.constants),
            ComponentKey::Manifest => Some(&mut self.manifest),
            _ => None,
        }
    }

    /// Reads without triggering a pull. Records the access.
    pub(crate) fn read(&mut self, route: &Route) -> Option<Value> {
        match route {
            Route::Component(key, path) => {
                if let Some(item) = self.item_mut(*key) {
                    item.value();
                    return match path {
                        None => Some(item.peek().clone()),
                        Some(path) => item.value_at(path.segments()).cloned(),
                    };
                }
                let container = self.container_mut(*key)?;
                match path {
                    None => Some(container.to_value()),
                    Some(path) => container.get_item(&path.to_string()),
                }
            }
            Route::Root(path) => self.root.get_item(&path.to_string()),
        }
    }

    // ── Path operations ──────────────────────────────────────────

    /// Returns the value at `path`, pulling first when
    /// `always_pull_before_getting` is set.
    pub fn get_item(&mut self, path: &str) -> ContextResult<Option<Value>> {
        let Some(route) = self.route(path) else {
            return Ok(None);
        };
        if self.operations.always_pull_before_getting {
            let item_path = route.sync_path();
            self.pull(None, item_path.as_deref(), &SyncOptions::default())?;
        }
        Ok(self.read(&route))
    }

    /// Returns the value at `path` without pulling or touching timestamps.
    #[must_use]
    pub fn peek_item(&self, path: &str) -> Option<Value> {
        match self.route(path)? {
            Route::Component(key, path) => self.component(key).peek(path.as_ref()),
            Route::Root(path) => self.root.peek_item(&path.to_string()),
        }
    }

    /// Writes `value` at `path`.
    ///
    /// Writes into `schema`, `constants` or `manifest` always fail with
    /// [`ContextError::FrozenMutation`], whatever `options` says.
    pub fn set_item(
        &mut self,
        path: &str,
        value: Value,
        options: SetOptions,
        overrides: SetOverrides,
    ) -> ContextResult<()> {
        let Some(route) = self.route(path) else {
            return self.reject(format!("invalid path {path:?}"));
        };
        if let Route::Component(key, _) = &route {
            if key.is_frozen() {
                return Err(ContextError::FrozenMutation { component: *key });
            }
        }

        let item_path = route.sync_path();
        if self.operations.always_pull_before_setting && !overrides.skip_pull {
            self.pull(None, item_path.as_deref(), &SyncOptions::default())?;
        }

        match route {
            Route::Component(key, None) => {
                if !(value.is_object() || value.is_null()) {
                    return self.reject(format!("{key} must be set to an object"));
                }
                let replacement =
                    component_container(key, value, self.enhanced_nested_path_checking)?;
                if let Some(container) = self.container_mut(key) {
                    *container = replacement;
                }
            }
            Route::Component(key, Some(inner)) => {
                if let Some(container) = self.container_mut(key) {
                    container.set_item(&inner.to_string(), value, options)?;
                }
            }
            Route::Root(inner) => {
                self.root.set_item(&inner.to_string(), value, options)?;
            }
        }
        debug!(context = %self.id, path, "Set item");

        if self.operations.always_push_after_setting && !overrides.skip_push {
            self.push(item_path.as_deref(), &SyncOptions::default())?;
        }
        Ok(())
    }

    /// True if `path` resolves to a stored key.
    ///
    /// Plain objects inside a leaf are only looked into when nested-path
    /// checking was enabled at construction. Frozen component payloads are
    /// always looked into.
    #[must_use]
    pub fn has_item(&self, path: &str) -> bool {
        match self.route(path) {
            Some(Route::Component(key, path)) => self.component(key).has(path.as_ref()),
            Some(Route::Root(path)) => self.root.has_item(&path.to_string()),
            None => false,
        }
    }

    /// Removes the entry at `path`. Components themselves cannot be removed.
    pub fn remove_item(&mut self, path: &str) -> ContextResult<bool> {
        let Some(route) = self.route(path) else {
            return Ok(false);
        };
        match route {
            Route::Component(key, _) if key.is_frozen() => {
                Err(ContextError::FrozenMutation { component: key })
            }
            Route::Component(key, None) => {
                self.reject(format!("component {key} cannot be removed"))?;
                Ok(false)
            }
            Route::Component(key, Some(inner)) => match self.container_mut(key) {
                Some(container) => Ok(container.remove_item(&inner.to_string())?),
                None => Ok(false),
            },
            Route::Root(inner) => Ok(self.root.remove_item(&inner.to_string())?),
        }
    }

    /// Like [`Context::get_item`], but also tries `_`-prefixed spellings of
    /// reserved segments (`value`, `metadata`, `size`, ...).
    pub fn get_reserved_item(&mut self, path: &str) -> ContextResult<Option<Value>> {
        if let Some(value) = self.get_item(path)? {
            return Ok(Some(value));
        }
        let Ok(parsed) = DotPath::parse(path) else {
            return Ok(None);
        };
        for variant in parsed.reserved_variants() {
            let found = self
                .route(&variant.to_string())
                .and_then(|route| self.read(&route));
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// Applies the validation policy to a rejected write.
    fn reject(&self, message: String) -> ContextResult<()> {
        let err = ContextError::Validation(message);
        match self.operations.error_handling.on_validation_error {
            ErrorPolicy::Throw => Err(err),
            ErrorPolicy::Warn => {
                warn!(context = %self.id, error = %err, "Rejected write");
                Ok(())
            }
            ErrorPolicy::Silent => Ok(()),
        }
    }

    // ── Merge and compare ────────────────────────────────────────

    /// Merges with `other`, this context acting as the source.
    ///
    /// Pulls first and pushes afterwards per the operations parameters.
    pub fn merge(
        &mut self,
        other: &mut Context,
        strategy: MergeStrategy,
        options: &MergeOptions,
    ) -> ContextResult<MergeResult> {
        let item_path = options.single_item.clone();
        if self.operations.always_pull_before_setting {
            self.pull(None, item_path.as_deref(), &SyncOptions::default())?;
        }

        let result = Merger::merge(self, other, strategy, options);
        debug!(
            source = %self.id,
            target = %other.id,
            %strategy,
            processed = result.items_processed,
            success = result.success,
            "Merged contexts"
        );

        if self.operations.always_push_after_setting {
            self.push(item_path.as_deref(), &SyncOptions::default())?;
        }
        Ok(result)
    }

    /// Merges the single `component.path` `item_path` with `other`.
    pub fn merge_item(
        &mut self,
        other: &mut Context,
        item_path: &str,
        strategy: MergeStrategy,
        options: &MergeOptions,
    ) -> ContextResult<MergeResult> {
        let options = options.clone().with_single_item(item_path);
        self.merge(other, strategy, &options)
    }

    /// Predicts a merge with `other` without writing.
    #[must_use]
    pub fn analyze_merge(
        &self,
        other: &Context,
        strategy: MergeStrategy,
        options: &MergeOptions,
    ) -> MergeAnalysis {
        Merger::analyze(self, other, strategy, options)
    }

    /// Structural comparison with `other`, this context as the source.
    #[must_use]
    pub fn compare(&self, other: &Context, options: &CompareOptions) -> CompareResult {
        Comparison::compare(self, other, options)
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Replaces the provided component values, including the frozen ones,
    /// and resets metrics and the pull cooldown.
    pub fn reinitialize(&mut self, params: Reinitialize) -> ContextResult<()> {
        let enhanced = self.enhanced_nested_path_checking;
        let containers = [
            (ComponentKey::Flags, params.flags),
            (ComponentKey::State, params.state),
            (ComponentKey::Data, params.data),
            (ComponentKey::Settings, params.settings),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .map(|(key, value)| component_container(key, value, enhanced).map(|c| (key, c)))
        .collect::<ContextResult<Vec<_>>>()?;

        if let Some(value) = params.context_schema {
            self.schema.reinitialize(value);
        }
        if let Some(value) = params.constants {
            self.constants.reinitialize(value);
        }
        if let Some(value) = params.manifest {
            self.manifest.reinitialize(value);
        }
        for (key, container) in containers {
            if let Some(slot) = self.container_mut(key) {
                *slot = container;
            }
        }

        self.metrics.reset();
        self.cooldown.reset();
        debug!(context = %self.id, "Reinitialized context");
        Ok(())
    }

    /// Empties the mutable components and the top-level mapping, and resets
    /// metrics and the pull cooldown. Frozen components keep their values.
    pub fn clear(&mut self) -> ContextResult<()> {
        self.flags.clear()?;
        self.state.clear()?;
        self.data.clear()?;
        self.settings.clear()?;
        self.root.clear()?;
        self.metrics.reset();
        self.cooldown.reset();
        debug!(context = %self.id, "Cleared context");
        Ok(())
    }
}

impl ComponentTree for Context {
    fn component(&self, key: ComponentKey) -> ComponentRef<'_> {
        match key {
            ComponentKey::Schema => ComponentRef::Item(&self.schema),
            ComponentKey::Constants => ComponentRef::Item(&self.constants),
            ComponentKey::Manifest => ComponentRef::Item(&self.manifest),
            ComponentKey::Flags => ComponentRef::Container(&self.flags),
            ComponentKey::State => ComponentRef::Container(&self.state),
            ComponentKey::Data => ComponentRef::Container(&self.data),
            ComponentKey::Settings => ComponentRef::Container(&self.settings),
        }
    }

    fn container_mut(&mut self, key: ComponentKey) -> Option<&mut ContextContainer> {
        match key {
            ComponentKey::Flags => Some(&mut self.flags),
            ComponentKey::State => Some(&mut self.state),
            ComponentKey::Data => Some(&mut self.data),
            ComponentKey::Settings => Some(&mut self.settings),
            ComponentKey::Schema | ComponentKey::Constants | ComponentKey::Manifest => None,
        }
    }

    fn label(&self) -> String {
        format!("{}#{}", self.context_location, self.id)
    }
}
