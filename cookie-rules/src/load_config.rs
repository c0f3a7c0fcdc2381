/// `load_config` module: loads the optional static YAML config for the CLI.
///
/// The YAML file only holds non-secret settings: where the rule list and its
/// schema live, which schema version the rule list follows, where browser
/// compat data comes from, and which bucket/collections to write to. Every
/// field has a default, so running without `--config` works against the
/// standard repository layout.
///
/// Credentials and the target server never come from this file; they are read
/// from the environment into [`cookie_rules_core::config::RemoteConfig`].
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich diagnostics,
/// and are surfaced at the CLI boundary.
use anyhow::Result;
use cookie_rules_core::rules::SchemaVersion;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const DEFAULT_BUCKET: &str = "main-workspace";
pub const DEFAULT_BROWSERS_COLLECTION: &str = "devtools-compatibility-browsers";
pub const DEFAULT_RULES_COLLECTION: &str = "cookie-banner-rules-list";
pub const DEFAULT_RULE_LIST: &str = "cookie-banner-rules-list.json";
pub const DEFAULT_SCHEMA: &str = "CookieBannerRuleList.schema.json";
pub const DEFAULT_COMPAT_SOURCE: &str = "https://unpkg.com/@mdn/browser-compat-data/data.json";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub remote: RemoteSection,
    pub rules: RulesSection,
    pub compat: CompatSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
    pub bucket: String,
    pub browsers_collection: String,
    pub rules_collection: String,
}

impl Default for RemoteSection {
    fn default() -> Self {
        RemoteSection {
            bucket: DEFAULT_BUCKET.to_string(),
            browsers_collection: DEFAULT_BROWSERS_COLLECTION.to_string(),
            rules_collection: DEFAULT_RULES_COLLECTION.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RulesSection {
    pub path: PathBuf,
    pub schema: PathBuf,
    pub schema_version: SchemaVersion,
}

impl Default for RulesSection {
    fn default() -> Self {
        RulesSection {
            path: PathBuf::from(DEFAULT_RULE_LIST),
            schema: PathBuf::from(DEFAULT_SCHEMA),
            schema_version: SchemaVersion::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CompatSection {
    /// Local path or http(s) URL of a browser-compat-data JSON document.
    pub source: String,
}

impl Default for CompatSection {
    fn default() -> Self {
        CompatSection {
            source: DEFAULT_COMPAT_SOURCE.to_string(),
        }
    }
}

/// Loads the YAML config at `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let Some(path_ref) = path else {
        info!("No config file given, using defaults");
        return Ok(CliConfig::default());
    };
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file is a valid "all defaults" config.
    if config_content.trim().is_empty() {
        return Ok(CliConfig::default());
    }

    match serde_yaml::from_str::<CliConfig>(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}
