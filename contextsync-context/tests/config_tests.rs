use contextsync_context::{
    Context, ContextConfig, ContextError, ErrorPolicy, InitializationParams, OperationsParams,
    PerformanceMetrics, PullCooldown, default_initialization_params, default_operations_params,
};
use contextsync_types::ComponentKey;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::{Duration, Instant};

// ── Defaults ─────────────────────────────────────────────────────

#[test]
fn defaults_are_fresh_values() {
    let mut first = default_initialization_params();
    first.data = json!({"mutated": true});
    let second = default_initialization_params();
    assert_eq!(second.data, json!({}));
    assert_eq!(second.naming_convention.len(), 7);
    assert_eq!(second.naming_convention["settings"], ComponentKey::Settings);
}

#[test]
fn default_operations_do_nothing_automatically() {
    let ops = default_operations_params();
    assert!(!ops.always_pull_before_getting);
    assert!(!ops.always_pull_before_setting);
    assert!(!ops.always_push_after_setting);
    assert!(ops.pull_from.is_empty());
    assert_eq!(ops.error_handling.on_pull_error, ErrorPolicy::Warn);
    assert_eq!(ops.error_handling.on_validation_error, ErrorPolicy::Throw);
}

// ── JSON configuration ───────────────────────────────────────────

#[test]
fn parses_camel_case_config() {
    let config = ContextConfig::from_json_str(
        r#"{
            "initializationParams": {
                "contextLocation": "session",
                "data": {"player": {"name": "Hero"}},
                "namingConvention": {"gameData": "data", "prefs": "settings"}
            },
            "operationsParams": {
                "alwaysPullBeforeGetting": true,
                "errorHandling": {"onPullError": "silent"}
            },
            "enhancedNestedPathChecking": true,
            "pullCooldownMs": 250
        }"#,
    )
    .unwrap();

    assert_eq!(config.initialization_params.context_location.as_deref(), Some("session"));
    assert!(config.operations_params.always_pull_before_getting);
    assert_eq!(config.operations_params.error_handling.on_pull_error, ErrorPolicy::Silent);
    assert_eq!(config.operations_params.error_handling.on_push_error, ErrorPolicy::Warn);
    assert_eq!(config.pull_cooldown(), Duration::from_millis(250));

    let mut ctx = Context::with_config(config).unwrap();
    assert_eq!(ctx.get_item("gameData.player.name").unwrap(), Some(json!("Hero")));
    assert!(ctx.has_item("data.player.name"));
    assert_eq!(ctx.pull_cooldown().window(), Duration::from_millis(250));
}

#[test]
fn missing_cooldown_defaults_to_one_second() {
    let config = ContextConfig::from_json_str("{}").unwrap();
    assert_eq!(config.pull_cooldown(), Duration::from_millis(1000));
}

#[test]
fn bad_config_is_a_configuration_error() {
    let unknown_component = ContextConfig::from_json_str(
        r#"{"initializationParams": {"namingConvention": {"x": "nowhere"}}}"#,
    );
    assert!(matches!(unknown_component, Err(ContextError::Configuration(_))));

    let empty_location =
        ContextConfig::from_json_str(r#"{"initializationParams": {"contextLocation": ""}}"#);
    assert!(matches!(empty_location, Err(ContextError::Configuration(_))));

    let not_json = ContextConfig::from_json_str("not json");
    assert!(matches!(not_json, Err(ContextError::Configuration(_))));
}

#[test]
fn dotted_names_are_rejected() {
    let mut init = InitializationParams::default();
    init.naming_convention.shift_remove("data");
    init.naming_convention.insert("game.data".to_string(), ComponentKey::Data);
    assert!(init.validate().is_err());
    assert!(Context::new(init, OperationsParams::default()).is_err());
}

// ── Metrics and cooldown ─────────────────────────────────────────

#[test]
fn cooldown_window() {
    let mut cooldown = PullCooldown::new(Duration::from_millis(100));
    let start = Instant::now();
    assert!(!cooldown.is_cooling(start));

    cooldown.reset();
    assert_eq!(cooldown.remaining(start), Duration::ZERO);
    assert_eq!(PullCooldown::default().window(), Duration::from_millis(1000));
}

#[test]
fn metrics_average() {
    let metrics = PerformanceMetrics::default();
    assert_eq!(metrics.average_pull_time(), None);
    assert_eq!(metrics.pull_operations, 0);
}
