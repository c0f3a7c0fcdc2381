//! HTTP implementation of the core `SchemaFetcher`.

use async_trait::async_trait;
use cookie_rules_core::contract::SchemaFetcher;
use cookie_rules_core::error::SchemaError;
use serde_json::Value;

#[derive(Default)]
pub struct HttpSchemaFetcher {
    http: reqwest::Client,
}

impl HttpSchemaFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchemaFetcher for HttpSchemaFetcher {
    async fn fetch_schema(&self, uri: &str) -> Result<Value, SchemaError> {
        let fetch_error = |reason: String| SchemaError::Fetch {
            uri: uri.to_string(),
            reason,
        };

        tracing::info!(uri, "Loading remote schema");
        let response = self
            .http
            .get(uri)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            tracing::error!(uri, status = status.as_u16(), "Remote schema could not be loaded");
            return Err(fetch_error(format!("Loading error: {}", status.as_u16())));
        }
        response
            .json()
            .await
            .map_err(|e| fetch_error(format!("not a JSON document: {e}")))
    }
}
