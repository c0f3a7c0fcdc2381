use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Deployment the remote server belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Stage,
    Prod,
}

impl Environment {
    /// Only the dev server lets a writer approve its own changes.
    pub fn allows_self_approval(&self) -> bool {
        matches!(self, Environment::Dev)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Environment::Dev),
            "stage" => Ok(Environment::Stage),
            "prod" => Ok(Environment::Prod),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Dev => "dev",
            Environment::Stage => "stage",
            Environment::Prod => "prod",
        })
    }
}

/// Connection settings for the Remote Settings writer, read once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Raw `Authorization` header value, e.g. `Bearer XXXX`.
    pub authorization: String,
    /// Writer server URL, e.g. `https://settings-writer.stage.mozaws.net/v1`.
    pub server: String,
    pub environment: Option<Environment>,
    /// When set, mutating calls are logged and skipped.
    pub dry_run: bool,
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("authorization", &"<redacted>")
            .field("server", &self.server)
            .field("environment", &self.environment)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl RemoteConfig {
    /// Builds the config from `AUTHORIZATION`, `SERVER`, `ENVIRONMENT` and
    /// `DRY_RUN` as returned by `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let authorization = get("AUTHORIZATION").ok_or(ConfigError::Missing("AUTHORIZATION"))?;
        let server = get("SERVER").ok_or(ConfigError::Missing("SERVER"))?;
        let environment = get("ENVIRONMENT")
            .map(|v| v.parse::<Environment>())
            .transpose()?;
        let dry_run = get("DRY_RUN").as_deref() == Some("1");

        let config = RemoteConfig {
            authorization,
            server: server.trim_end_matches('/').to_string(),
            environment,
            dry_run,
        };
        config.trace_loaded();
        Ok(config)
    }

    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn trace_loaded(&self) {
        info!(
            server = %self.server,
            environment = ?self.environment,
            dry_run = self.dry_run,
            "Loaded remote config"
        );
        debug!(config = ?self, "Remote config loaded (full debug)");
    }
}
