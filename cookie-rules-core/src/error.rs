//! Error types shared by the core pipelines.

use thiserror::Error;

/// Errors surfaced by a [`crate::contract::RecordStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The server answered, but not with the status the operation expects.
    #[error("{operation} returned [{status}] {reason}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        reason: String,
    },
    /// The request never produced a usable response.
    #[error("transport error during {operation}: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },
    /// The response body could not be decoded.
    #[error("could not decode response of {operation}: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    /// A rejection is a per-record failure the sync loop logs and skips.
    /// Everything else aborts the run.
    pub fn is_rejection(&self) -> bool {
        matches!(self, StoreError::UnexpectedStatus { .. })
    }
}

/// Errors while fetching or compiling the rule list schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to load schema {uri}: {reason}")]
    Fetch { uri: String, reason: String },
    #[error("schema compilation failed: {0}")]
    Compile(String),
}

/// Errors while reading browser compatibility data.
#[derive(Debug, Error)]
pub enum CompatError {
    #[error("compat data is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors while building [`crate::config::RemoteConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable needs to be set")]
    Missing(&'static str),
    #[error("ENVIRONMENT environment variable needs to be set to one of the following values: dev, stage, prod (got {0:?})")]
    InvalidEnvironment(String),
}

/// Errors from the rule list publisher.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("rule list has no \"data\" array")]
    MissingData,
    #[error("rule #{index} has no string id")]
    MissingId { index: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}
