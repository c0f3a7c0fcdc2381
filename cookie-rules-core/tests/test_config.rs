use std::collections::HashMap;

use cookie_rules_core::config::{Environment, RemoteConfig};
use cookie_rules_core::error::ConfigError;
use cookie_rules_core::synchronise::SyncOptions;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_full_environment_is_accepted() {
    let config = RemoteConfig::from_lookup(lookup(&[
        ("AUTHORIZATION", "Bearer abc"),
        ("SERVER", "https://settings-writer.stage.mozaws.net/v1/"),
        ("ENVIRONMENT", "dev"),
        ("DRY_RUN", "1"),
    ]))
    .expect("config should load");

    assert_eq!(config.authorization, "Bearer abc");
    assert_eq!(config.server, "https://settings-writer.stage.mozaws.net/v1");
    assert_eq!(config.environment, Some(Environment::Dev));
    assert!(config.dry_run);

    let options = SyncOptions::from(&config);
    assert!(options.dry_run);
    assert_eq!(options.environment, Some(Environment::Dev));
}

#[test]
fn test_optional_values_default_off() {
    let config = RemoteConfig::from_lookup(lookup(&[
        ("AUTHORIZATION", "Bearer abc"),
        ("SERVER", "http://localhost:8888/v1"),
        ("DRY_RUN", "true"),
    ]))
    .unwrap();
    assert_eq!(config.environment, None);
    assert!(!config.dry_run, "only DRY_RUN=1 enables dry-run");
}

#[test]
fn test_required_values_are_enforced() {
    assert_eq!(
        RemoteConfig::from_lookup(lookup(&[("SERVER", "http://localhost")])),
        Err(ConfigError::Missing("AUTHORIZATION"))
    );
    assert_eq!(
        RemoteConfig::from_lookup(lookup(&[("AUTHORIZATION", "Bearer x"), ("SERVER", "")])),
        Err(ConfigError::Missing("SERVER"))
    );
}

#[test]
fn test_unknown_environment_is_rejected() {
    let result = RemoteConfig::from_lookup(lookup(&[
        ("AUTHORIZATION", "Bearer abc"),
        ("SERVER", "http://localhost"),
        ("ENVIRONMENT", "production"),
    ]));
    assert_eq!(
        result,
        Err(ConfigError::InvalidEnvironment("production".into()))
    );
}

#[test]
fn test_debug_output_hides_credentials() {
    let config = RemoteConfig::from_lookup(lookup(&[
        ("AUTHORIZATION", "Bearer secret-token"),
        ("SERVER", "http://localhost"),
    ]))
    .unwrap();
    assert!(!format!("{config:?}").contains("secret-token"));
}
