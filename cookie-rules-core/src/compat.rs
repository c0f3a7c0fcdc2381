//! Browser compatibility data (`@mdn/browser-compat-data` layout) and its
//! flattening into one [`BrowserRelease`] per (browser, version).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::contract::RecordData;
use crate::error::CompatError;

/// Lifecycle status of a release that should not exist remotely.
pub const RETIRED_STATUS: &str = "retired";

/// The part of the compat data this tool reads. Other top-level sections
/// (`api`, `css`, `__meta`, ...) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompatData {
    #[serde(default)]
    pub browsers: BTreeMap<String, BrowserInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowserInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub releases: BTreeMap<String, ReleaseInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseInfo {
    #[serde(default)]
    pub status: Option<String>,
}

/// One browser release, shaped like the records of the browsers collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserRelease {
    pub browserid: String,
    pub name: String,
    pub status: String,
    pub version: String,
}

impl BrowserRelease {
    pub fn is_retired(&self) -> bool {
        self.status == RETIRED_STATUS
    }

    pub fn to_record_data(&self) -> RecordData {
        let mut data = RecordData::new();
        data.insert("browserid".into(), Value::String(self.browserid.clone()));
        data.insert("name".into(), Value::String(self.name.clone()));
        data.insert("status".into(), Value::String(self.status.clone()));
        data.insert("version".into(), Value::String(self.version.clone()));
        data
    }
}

pub fn parse_compat_data(text: &str) -> Result<CompatData, CompatError> {
    Ok(serde_json::from_str(text)?)
}

/// Flattens `browsers[id].releases[version]` into a list of releases.
///
/// Releases without a browser name, without a status, or whose version has no
/// digit are skipped with a warning; bad data upstream never fails the run.
pub fn flatten_releases(data: &CompatData) -> Vec<BrowserRelease> {
    let mut releases = Vec::new();
    for (browserid, info) in &data.browsers {
        for (version, release) in &info.releases {
            let Some(name) = info.name.as_deref().filter(|n| !n.is_empty()) else {
                warn!(browserid = %browserid, version = %version, "\"name\" property is expected but wasn't found");
                continue;
            };
            let Some(status) = release.status.as_deref().filter(|s| !s.is_empty()) else {
                warn!(browserid = %browserid, version = %version, "\"status\" property is expected but wasn't found");
                continue;
            };
            if !version.chars().any(|c| c.is_ascii_digit()) {
                warn!(browserid = %browserid, version = %version, "release number doesn't have expected shape");
                continue;
            }
            releases.push(BrowserRelease {
                browserid: browserid.clone(),
                name: name.to_string(),
                status: status.to_string(),
                version: version.clone(),
            });
        }
    }
    debug!(count = releases.len(), "Flattened browser releases");
    releases
}
