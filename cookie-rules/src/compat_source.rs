//! Loads browser compatibility data from a local file or an http(s) URL.

use anyhow::{Context, Result};
use cookie_rules_core::compat::{parse_compat_data, CompatData};
use tracing::info;

pub async fn load_compat_data(location: &str) -> Result<CompatData> {
    let text = if location.starts_with("http://") || location.starts_with("https://") {
        info!(url = location, "Downloading browser compat data");
        reqwest::get(location)
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Failed to download compat data from {location}"))?
            .text()
            .await
            .with_context(|| format!("Failed to read compat data body from {location}"))?
    } else {
        info!(path = location, "Reading browser compat data");
        tokio::fs::read_to_string(location)
            .await
            .with_context(|| format!("Failed to read compat data file {location}"))?
    };
    parse_compat_data(&text).with_context(|| format!("Invalid compat data at {location}"))
}
