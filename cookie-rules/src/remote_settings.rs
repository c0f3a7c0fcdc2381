#![doc = "Remote Settings client: implements the core `RecordStore` trait over the Kinto HTTP API."]
//
//! # Remote Settings integration (CLI <-> Core)
//!
//! This module provides the bridge between the CLI commands and the
//! [`RecordStore`] abstraction in `cookie-rules-core`. One
//! [`RemoteSettingsClient`] addresses one collection:
//! `{server}/buckets/{bucket}/collections/{collection}`.
//!
//! - Construct it from a validated [`RemoteConfig`] plus bucket and collection names.
//! - Every request carries the raw `Authorization` header from the config.
//! - Statuses other than the expected one map to [`StoreError::UnexpectedStatus`];
//!   connection problems map to [`StoreError::Transport`].

use async_trait::async_trait;
use cookie_rules_core::config::RemoteConfig;
use cookie_rules_core::contract::{
    CollectionStatus, RecordData, RecordStore, RemoteRecord, ServerInfo,
};
use cookie_rules_core::error::StoreError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct RecordsEnvelope {
    data: Vec<RemoteRecord>,
}

pub struct RemoteSettingsClient {
    http: reqwest::Client,
    server: String,
    collection_url: String,
}

impl RemoteSettingsClient {
    pub fn new(config: &RemoteConfig, bucket: &str, collection: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&config.authorization).map_err(|e| {
            tracing::error!(error = %e, "AUTHORIZATION is not a valid header value");
            anyhow::anyhow!("AUTHORIZATION is not a valid header value: {e}")
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        let server = config.server.trim_end_matches('/').to_string();
        let collection_url = format!("{server}/buckets/{bucket}/collections/{collection}");
        tracing::info!(
            collection_url = %collection_url,
            "Initialized Remote Settings client"
        );
        Ok(RemoteSettingsClient {
            http,
            server,
            collection_url,
        })
    }

    fn records_url(&self) -> String {
        format!("{}/records", self.collection_url)
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> Result<Response, StoreError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, operation, "Request failed");
            StoreError::Transport {
                operation,
                message: e.to_string(),
            }
        })?;
        let status = response.status();
        if status != expected {
            tracing::warn!(status = status.as_u16(), operation, "Unexpected response status");
            return Err(StoreError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RecordStore for RemoteSettingsClient {
    async fn list_records(&self) -> Result<Vec<RemoteRecord>, StoreError> {
        let operation = "list records";
        tracing::info!(collection_url = %self.collection_url, "Get existing records");
        let response = self
            .send(operation, self.http.get(self.records_url()), StatusCode::OK)
            .await?;
        let envelope: RecordsEnvelope =
            response.json().await.map_err(|e| StoreError::Decode {
                operation,
                message: e.to_string(),
            })?;
        tracing::info!(count = envelope.data.len(), "Fetched records");
        Ok(envelope.data)
    }

    async fn create_record(&self, data: &RecordData) -> Result<(), StoreError> {
        let request = self.http.post(self.records_url()).json(&json!({ "data": data }));
        self.send("create record", request, StatusCode::CREATED)
            .await?;
        Ok(())
    }

    async fn update_record(&self, id: &str, data: &RecordData) -> Result<(), StoreError> {
        let url = format!("{}/{id}", self.records_url());
        let request = self.http.put(url).json(&json!({ "data": data }));
        self.send("update record", request, StatusCode::OK).await?;
        Ok(())
    }

    async fn delete_record(&self, id: &str) -> Result<(), StoreError> {
        let url = format!("{}/{id}", self.records_url());
        self.send("delete record", self.http.delete(url), StatusCode::OK)
            .await?;
        Ok(())
    }

    async fn transition_status(&self, status: CollectionStatus) -> Result<(), StoreError> {
        let request = self
            .http
            .patch(&self.collection_url)
            .json(&json!({ "data": { "status": status } }));
        self.send("patch collection", request, StatusCode::OK)
            .await?;
        tracing::info!(status = status.as_str(), "Collection status updated");
        Ok(())
    }

    async fn server_info(&self) -> Result<ServerInfo, StoreError> {
        let operation = "server info";
        let url = format!("{}/", self.server);
        let response = self.send(operation, self.http.get(url), StatusCode::OK).await?;
        response.json().await.map_err(|e| StoreError::Decode {
            operation,
            message: e.to_string(),
        })
    }
}
