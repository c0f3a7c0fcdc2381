//! High-level pipeline: keeps the browsers collection in line with compat data.
//!
//! This module orchestrates one sync run of the browsers collection:
//!   - Fetches the current remote records (fatal on failure)
//!   - Plans the three-way diff against the flattened local releases ([`plan_sync`])
//!   - Applies the plan one call at a time through a [`RecordStore`] ([`apply_plan`])
//!   - Re-fetches the collection and asks for review, or approves on dev
//!
//! # Major Types
//! - [`SyncPlan`] / [`Operation`]: the diff, computed without touching the store
//! - [`SyncOptions`]: dry-run flag and environment, taken from [`RemoteConfig`]
//! - [`SyncReport`]: what was added, updated and removed, plus the review step taken
//!
//! # Error Handling
//! Each create/update/delete is attempted independently. A rejected call
//! (unexpected HTTP status) is logged and left out of the report; it does not
//! stop the run. Failing to list records, transport errors and a failed review
//! transition are returned to the caller.
//!
//! The plan/apply split is shared with [`crate::publish`], which drives the same
//! operations for the rule list collection.

use tracing::{debug, info, warn};

use crate::compat::BrowserRelease;
use crate::config::{Environment, RemoteConfig};
use crate::contract::{CollectionStatus, RecordData, RecordStore, RemoteRecord};
use crate::error::StoreError;

/// One change to apply to a remote collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation<T> {
    Create(T),
    Update { record_id: String, item: T },
    Delete(RemoteRecord),
}

/// An ordered list of operations; creates and updates first, then deletes of
/// records that no longer exist locally.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan<T> {
    pub operations: Vec<Operation<T>>,
}

impl<T> Default for SyncPlan<T> {
    fn default() -> Self {
        SyncPlan {
            operations: Vec::new(),
        }
    }
}

impl<T> SyncPlan<T> {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }
}

/// Items that can be written to a collection as a `data` payload.
pub trait AsRecordData {
    fn record_data(&self) -> RecordData;
    /// Short label for log lines.
    fn label(&self) -> String;
}

impl AsRecordData for BrowserRelease {
    fn record_data(&self) -> RecordData {
        self.to_record_data()
    }

    fn label(&self) -> String {
        format!("{} {}", self.browserid, self.version)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub environment: Option<Environment>,
}

impl From<&RemoteConfig> for SyncOptions {
    fn from(config: &RemoteConfig) -> Self {
        SyncOptions {
            dry_run: config.dry_run,
            environment: config.environment,
        }
    }
}

/// Successful operations of an applied plan.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedPlan<T> {
    pub added: Vec<T>,
    pub updated: Vec<T>,
    pub removed: Vec<RemoteRecord>,
    /// Operations the server rejected.
    pub failed: usize,
}

impl<T> Default for AppliedPlan<T> {
    fn default() -> Self {
        AppliedPlan {
            added: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
            failed: 0,
        }
    }
}

impl<T> AppliedPlan<T> {
    pub fn change_count(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub added: Vec<BrowserRelease>,
    pub updated: Vec<BrowserRelease>,
    pub removed: Vec<RemoteRecord>,
    pub failed: usize,
    /// Remote records after the changes; empty when nothing changed.
    pub refreshed: Vec<RemoteRecord>,
    /// Review transition requested, if any change was made.
    pub review: Option<CollectionStatus>,
}

impl SyncReport {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty() || !self.removed.is_empty()
    }
}

fn matches_release(record: &RemoteRecord, release: &BrowserRelease) -> bool {
    record.str_field("browserid") == Some(release.browserid.as_str())
        && record.str_field("version") == Some(release.version.as_str())
}

/// Computes the operations that make `remote` mirror the non-retired entries
/// of `local`.
///
/// First pass, over local releases:
/// - retired with a remote match: delete the remote record
/// - active without a match: create
/// - active with a match whose `name` or `status` differ: update
///
/// Second pass, over remote records: delete any record with no local
/// release at all. A record whose local release is retired was handled by
/// the first pass and is not deleted twice.
pub fn plan_sync(local: &[BrowserRelease], remote: &[RemoteRecord]) -> SyncPlan<BrowserRelease> {
    let mut plan = SyncPlan::default();

    for release in local {
        let matched = remote.iter().find(|r| matches_release(r, release));
        match (release.is_retired(), matched) {
            (true, Some(record)) => plan.operations.push(Operation::Delete(record.clone())),
            (true, None) => {}
            (false, None) => plan.operations.push(Operation::Create(release.clone())),
            (false, Some(record)) => {
                let unchanged = record.str_field("name") == Some(release.name.as_str())
                    && record.str_field("status") == Some(release.status.as_str());
                if !unchanged {
                    plan.operations.push(Operation::Update {
                        record_id: record.id.clone(),
                        item: release.clone(),
                    });
                }
            }
        }
    }

    for record in remote {
        if !local.iter().any(|release| matches_release(record, release)) {
            plan.operations.push(Operation::Delete(record.clone()));
        }
    }

    debug!(operations = plan.len(), "[SYNC] Planned operations");
    plan
}

/// Turns a per-record result into "succeeded?", keeping fatal errors fatal.
fn tolerate_rejection(result: Result<(), StoreError>, label: &str) -> Result<bool, StoreError> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_rejection() => {
            warn!(item = %label, error = %e, "[SYNC] Remote rejected operation");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

fn dry_run_prefix(dry_run: bool) -> &'static str {
    if dry_run {
        "[DRY_RUN]"
    } else {
        ""
    }
}

/// Applies `plan` sequentially. In dry-run mode every call is logged and
/// counted as successful without reaching the store.
pub async fn apply_plan<T, S>(
    plan: SyncPlan<T>,
    store: &S,
    dry_run: bool,
) -> Result<AppliedPlan<T>, StoreError>
where
    T: AsRecordData,
    S: RecordStore + ?Sized,
{
    let mut applied = AppliedPlan::default();
    let prefix = dry_run_prefix(dry_run);

    for operation in plan.operations {
        match operation {
            Operation::Create(item) => {
                let label = item.label();
                info!(item = %label, "{prefix} Create");
                let ok = dry_run
                    || tolerate_rejection(store.create_record(&item.record_data()).await, &label)?;
                if ok {
                    applied.added.push(item);
                } else {
                    applied.failed += 1;
                }
            }
            Operation::Update { record_id, item } => {
                let label = item.label();
                info!(item = %label, record_id = %record_id, "{prefix} Update");
                let ok = dry_run
                    || tolerate_rejection(
                        store.update_record(&record_id, &item.record_data()).await,
                        &label,
                    )?;
                if ok {
                    applied.updated.push(item);
                } else {
                    applied.failed += 1;
                }
            }
            Operation::Delete(record) => {
                info!(record_id = %record.id, "{prefix} Delete");
                let ok = dry_run
                    || tolerate_rejection(store.delete_record(&record.id).await, &record.id)?;
                if ok {
                    applied.removed.push(record);
                } else {
                    applied.failed += 1;
                }
            }
        }
    }
    Ok(applied)
}

/// Moves the collection into `status`, unless this is a dry run.
pub async fn transition<S>(store: &S, status: CollectionStatus, dry_run: bool) -> Result<(), StoreError>
where
    S: RecordStore + ?Sized,
{
    info!(status = status.as_str(), "{} Requesting status transition", dry_run_prefix(dry_run));
    if dry_run {
        return Ok(());
    }
    store.transition_status(status).await?;
    info!(status = status.as_str(), "[SYNC] Status transition accepted");
    Ok(())
}

/// Entrypoint: sync the browsers collection with `releases`.
pub async fn synchronise<S>(
    releases: &[BrowserRelease],
    store: &S,
    options: &SyncOptions,
) -> Result<SyncReport, StoreError>
where
    S: RecordStore + ?Sized,
{
    info!(
        local = releases.len(),
        dry_run = options.dry_run,
        "[SYNC] Starting browsers synchronisation"
    );
    let remote = store.list_records().await?;
    info!(remote = remote.len(), "[SYNC] Fetched existing records");

    let plan = plan_sync(releases, &remote);
    let applied = apply_plan(plan, store, options.dry_run).await?;
    info!(
        added = applied.added.len(),
        updated = applied.updated.len(),
        removed = applied.removed.len(),
        failed = applied.failed,
        "[SYNC] Results"
    );

    let mut report = SyncReport {
        added: applied.added,
        updated: applied.updated,
        removed: applied.removed,
        failed: applied.failed,
        refreshed: Vec::new(),
        review: None,
    };

    if !report.has_changes() {
        info!("[SYNC] No changes detected");
        return Ok(report);
    }

    report.refreshed = store.list_records().await?;
    info!(records = report.refreshed.len(), "[SYNC] Browsers data synced, refreshed records");

    let status = match options.environment {
        Some(env) if env.allows_self_approval() => CollectionStatus::ToSign,
        _ => CollectionStatus::ToReview,
    };
    transition(store, status, options.dry_run).await?;
    report.review = Some(status);
    Ok(report)
}
