//! Publishes the rule list into its Remote Settings collection.
//!
//! The rule list file is the source of truth. Remote records are matched to
//! rules by `id`; the publisher creates, updates and deletes records through the
//! same [`apply_plan`] machinery as the browsers sync, then decides what to do
//! with the collection from the server's signer capabilities:
//! - collection (or its bucket) not signed: nothing
//! - signed, review and group check both disabled: approve (`to-sign`)
//! - otherwise: request review (`to-review`)

use std::collections::HashMap;

use serde_json::Value;
use tracing::{info, warn};

use crate::contract::{CollectionStatus, RecordData, RecordStore, RemoteRecord, ServerInfo};
use crate::error::PublishError;
use crate::synchronise::{apply_plan, transition, AppliedPlan, AsRecordData, Operation, SyncPlan};

/// Fields the server adds to every record; ignored when comparing.
const SERVER_MANAGED_FIELDS: &[&str] = &["id", "last_modified", "schema"];

/// A rule as pushed to the collection: the whole JSON object from the file.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleRecord {
    pub id: String,
    pub data: RecordData,
}

impl AsRecordData for RuleRecord {
    fn record_data(&self) -> RecordData {
        self.data.clone()
    }

    fn label(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub bucket: String,
    pub collection: String,
    pub dry_run: bool,
}

/// What to do with the collection once the records are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignoffAction {
    Nothing,
    Approve,
    RequestReview,
}

impl SignoffAction {
    pub fn status(&self) -> Option<CollectionStatus> {
        match self {
            SignoffAction::Nothing => None,
            SignoffAction::Approve => Some(CollectionStatus::ToSign),
            SignoffAction::RequestReview => Some(CollectionStatus::ToReview),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishReport {
    pub applied: AppliedPlan<RuleRecord>,
    pub signoff: SignoffAction,
}

/// Extracts the rules of a rule list document (`{ "data": [...] }`).
/// A document without a `data` array is refused rather than read as empty.
pub fn rule_records(document: &Value) -> Result<Vec<RuleRecord>, PublishError> {
    let rules = document
        .get("data")
        .and_then(Value::as_array)
        .ok_or(PublishError::MissingData)?;
    rules
        .iter()
        .enumerate()
        .map(|(index, rule)| {
            let data = rule.as_object().ok_or(PublishError::MissingId { index })?;
            let id = data
                .get("id")
                .and_then(Value::as_str)
                .ok_or(PublishError::MissingId { index })?;
            Ok(RuleRecord {
                id: id.to_string(),
                data: data.clone(),
            })
        })
        .collect()
}

fn without_server_fields(data: &RecordData) -> RecordData {
    data.iter()
        .filter(|(k, _)| !SERVER_MANAGED_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Creates missing rules, updates changed ones and deletes remote records
/// whose id no longer appears locally.
pub fn plan_publish(local: &[RuleRecord], remote: &[RemoteRecord]) -> SyncPlan<RuleRecord> {
    let mut by_id: HashMap<&str, &RemoteRecord> =
        remote.iter().map(|r| (r.id.as_str(), r)).collect();
    let mut plan = SyncPlan::default();

    for rule in local {
        match by_id.remove(rule.id.as_str()) {
            None => plan.operations.push(Operation::Create(rule.clone())),
            Some(record) => {
                if without_server_fields(&record.fields) != without_server_fields(&rule.data) {
                    plan.operations.push(Operation::Update {
                        record_id: record.id.clone(),
                        item: rule.clone(),
                    });
                }
            }
        }
    }

    // Keep server order for deletes.
    for record in remote {
        if by_id.contains_key(record.id.as_str()) {
            plan.operations.push(Operation::Delete(record.clone()));
        }
    }
    plan
}

/// Reads the sign-off configuration that applies to `bucket`/`collection`.
/// A collection-level resource wins over a bucket-level one; per-resource
/// flags override the server defaults.
pub fn signoff_action(info: &ServerInfo, bucket: &str, collection: &str) -> SignoffAction {
    let Some(signer) = info.capabilities.signer.as_ref() else {
        return SignoffAction::Nothing;
    };
    let resource = signer
        .resources
        .iter()
        .find(|r| r.source.bucket == bucket && r.source.collection.as_deref() == Some(collection))
        .or_else(|| {
            signer
                .resources
                .iter()
                .find(|r| r.source.bucket == bucket && r.source.collection.is_none())
        });
    let Some(resource) = resource else {
        return SignoffAction::Nothing;
    };

    let to_review = resource.to_review_enabled.unwrap_or(signer.to_review_enabled);
    let group_check = resource.group_check_enabled.unwrap_or(signer.group_check_enabled);
    if !to_review && !group_check {
        SignoffAction::Approve
    } else {
        SignoffAction::RequestReview
    }
}

/// Entrypoint: publish `rules` into the collection behind `store`.
pub async fn publish_rules<S>(
    rules: &[RuleRecord],
    store: &S,
    options: &PublishOptions,
) -> Result<PublishReport, PublishError>
where
    S: RecordStore + ?Sized,
{
    info!(
        bucket = %options.bucket,
        collection = %options.collection,
        rules = rules.len(),
        "[PUBLISH] Starting rule list publication"
    );
    let remote = store.list_records().await?;
    let plan = plan_publish(rules, &remote);
    if plan.is_empty() {
        info!("[PUBLISH] Records are in sync. Nothing to do.");
        return Ok(PublishReport {
            applied: AppliedPlan::default(),
            signoff: SignoffAction::Nothing,
        });
    }

    let applied = apply_plan(plan, store, options.dry_run).await?;
    if applied.failed > 0 {
        warn!(failed = applied.failed, "[PUBLISH] Some operations were rejected");
    }
    if applied.change_count() == 0 {
        return Ok(PublishReport {
            applied,
            signoff: SignoffAction::Nothing,
        });
    }

    let server_info = store.server_info().await?;
    let signoff = signoff_action(&server_info, &options.bucket, &options.collection);
    match signoff.status() {
        Some(status) => transition(store, status, options.dry_run).await?,
        None => info!(
            changes = applied.change_count(),
            "[PUBLISH] Collection is not signed, changes applied"
        ),
    }
    Ok(PublishReport { applied, signoff })
}
