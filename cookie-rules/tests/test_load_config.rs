use cookie_rules::load_config::{
    load_config, DEFAULT_BROWSERS_COLLECTION, DEFAULT_BUCKET, DEFAULT_COMPAT_SOURCE,
    DEFAULT_RULES_COLLECTION, DEFAULT_RULE_LIST,
};
use cookie_rules_core::rules::SchemaVersion;
use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// This test ensures that running without a config file yields the standard layout.
#[test]
fn test_load_config_defaults_without_file() {
    let config = load_config(None).expect("Defaults should load");
    assert_eq!(config.remote.bucket, DEFAULT_BUCKET);
    assert_eq!(config.remote.browsers_collection, DEFAULT_BROWSERS_COLLECTION);
    assert_eq!(config.remote.rules_collection, DEFAULT_RULES_COLLECTION);
    assert_eq!(config.rules.path, PathBuf::from(DEFAULT_RULE_LIST));
    assert_eq!(config.rules.schema_version, SchemaVersion::DomainsArray);
    assert_eq!(config.compat.source, DEFAULT_COMPAT_SOURCE);
}

/// This test ensures a partial config overrides only what it names.
#[test]
fn test_load_config_partial_override() {
    let config_yaml = r#"
remote:
  bucket: staging-workspace
rules:
  path: ./data/rules.json
  schema_version: single-domain
compat:
  source: ./vendor/bcd.json
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    let config = load_config(Some(config_file.path())).expect("Config should load");

    assert_eq!(config.remote.bucket, "staging-workspace");
    assert_eq!(config.remote.rules_collection, DEFAULT_RULES_COLLECTION);
    assert_eq!(config.rules.path, PathBuf::from("./data/rules.json"));
    assert_eq!(config.rules.schema_version, SchemaVersion::SingleDomain);
    assert_eq!(config.compat.source, "./vendor/bcd.json");
}

/// This test ensures that an empty file counts as "all defaults".
#[test]
fn test_load_config_empty_file() {
    let config_file = NamedTempFile::new().expect("temp file");
    let config = load_config(Some(config_file.path())).expect("Empty config should load");
    assert_eq!(config.remote.bucket, DEFAULT_BUCKET);
}

/// This test ensures that if the config file is not valid YAML, load_config errors and reports as such.
#[test]
fn test_load_config_errors_for_invalid_file() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), b"not-yaml: [:::").unwrap();

    let err = load_config(Some(config_file.path())).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[test]
fn test_load_config_errors_for_unknown_schema_version() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), "rules:\n  schema_version: triple-domain\n").unwrap();
    assert!(load_config(Some(config_file.path())).is_err());
}

#[test]
fn test_load_config_errors_for_missing_file() {
    let err = load_config(Some(PathBuf::from("does-not-exist.yaml").as_path())).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
