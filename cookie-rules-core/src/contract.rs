//! # contract: collaborator interfaces for the sync and validation pipelines
//!
//! The core never talks HTTP itself. Remote Settings collections are reached
//! through [`RecordStore`], and remote `$ref` schema fragments through
//! [`SchemaFetcher`]. The CLI crate provides `reqwest` implementations; tests use
//! the generated `mockall` mocks or hand-written in-memory fakes.
//!
//! All methods are async and issued one at a time by the pipelines.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{SchemaError, StoreError};

/// Field payload sent as `{ "data": ... }` to the record endpoints.
pub type RecordData = Map<String, Value>;

/// A record as persisted by the server: an opaque id plus the record fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<u64>,
    #[serde(flatten)]
    pub fields: RecordData,
}

impl RemoteRecord {
    /// Returns a string field, or `None` when absent or not a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Review workflow state a collection can be moved into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionStatus {
    /// Ask a reviewer to look at the pending changes.
    ToReview,
    /// Approve the pending changes; only honoured without multi sign-off.
    ToSign,
}

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::ToReview => "to-review",
            CollectionStatus::ToSign => "to-sign",
        }
    }
}

/// Subset of the server root document the publisher needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub signer: Option<SignerCapability>,
}

/// Server wide sign-off defaults plus the list of signed resources.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignerCapability {
    #[serde(default)]
    pub to_review_enabled: bool,
    #[serde(default)]
    pub group_check_enabled: bool,
    #[serde(default)]
    pub resources: Vec<SignerResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignerResource {
    pub source: SignerSource,
    #[serde(default)]
    pub to_review_enabled: Option<bool>,
    #[serde(default)]
    pub group_check_enabled: Option<bool>,
}

/// A `collection` of `None` means the whole bucket is signed.
#[derive(Debug, Clone, Deserialize)]
pub struct SignerSource {
    pub bucket: String,
    #[serde(default)]
    pub collection: Option<String>,
}

/// Trait for reading and mutating one remote record collection.
///
/// Implementors return [`StoreError::UnexpectedStatus`] when the server answers
/// with a status other than the one the operation expects (200, or 201 for
/// creation). Pipelines treat that as a per-record failure; any other error is
/// fatal for the run.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// `GET {collection}/records`
    async fn list_records(&self) -> Result<Vec<RemoteRecord>, StoreError>;

    /// `POST {collection}/records`, expects 201.
    async fn create_record(&self, data: &RecordData) -> Result<(), StoreError>;

    /// `PUT {collection}/records/{id}`, expects 200.
    async fn update_record(&self, id: &str, data: &RecordData) -> Result<(), StoreError>;

    /// `DELETE {collection}/records/{id}`, expects 200.
    async fn delete_record(&self, id: &str) -> Result<(), StoreError>;

    /// `PATCH {collection}` with `{ "data": { "status": ... } }`, expects 200.
    async fn transition_status(&self, status: CollectionStatus) -> Result<(), StoreError>;

    /// `GET {server}/`
    async fn server_info(&self) -> Result<ServerInfo, StoreError>;
}

/// Trait for resolving an external schema URI to its JSON document.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SchemaFetcher: Send + Sync {
    async fn fetch_schema(&self, uri: &str) -> Result<Value, SchemaError>;
}
