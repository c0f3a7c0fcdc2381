///
/// This module implements the CLI interface for cookie-rules: command parsing,
/// wiring of the HTTP collaborators into the core pipelines, and the
/// user-visible report output.
///
/// All business logic (validation rules, diff planning, sign-off decisions)
/// lives in the [`cookie-rules-core`] crate. This module is CLI glue only.
///
/// ## Commands
/// - `validate`: schema and semantic checks of the rule list file.
/// - `sync-browsers`: sync browser compat data into the browsers collection.
/// - `publish-rules`: sync the rule list into its own collection.
///
/// ## How To Use
/// - For command-line users: use the installed `cookie-rules` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`cookie-rules-core`]: ../../cookie-rules-core/
use crate::compat_source::load_compat_data;
use crate::load_config::{load_config, CliConfig};
use crate::remote_settings::RemoteSettingsClient;
use crate::schema_fetch::HttpSchemaFetcher;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cookie_rules_core::compat::flatten_releases;
use cookie_rules_core::config::RemoteConfig;
use cookie_rules_core::publish::{publish_rules, rule_records, PublishOptions, SignoffAction};
use cookie_rules_core::rules::SchemaVersion;
use cookie_rules_core::synchronise::{synchronise, SyncOptions, SyncReport};
use cookie_rules_core::validate::validate_rule_list;
use std::path::{Path, PathBuf};

/// CLI for the cookie banner rule list: validate it and keep Remote Settings in sync.
#[derive(Parser)]
#[clap(
    name = "cookie-rules",
    version,
    about = "Validate the cookie banner rule list and sync it and browser data to Remote Settings"
)]
pub struct Cli {
    /// Optional YAML config file; defaults apply to anything it leaves out
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the rule list against its schema and the semantic rules
    Validate {
        /// Rule list file (overrides the config)
        #[clap(long)]
        rules: Option<PathBuf>,
        /// Schema file (overrides the config)
        #[clap(long)]
        schema: Option<PathBuf>,
        /// Rule list layout: domains-array or single-domain
        #[clap(long)]
        schema_version: Option<SchemaVersion>,
    },
    /// Sync browser compat data into the browsers collection
    SyncBrowsers {
        /// Compat data path or URL (overrides the config)
        #[clap(long)]
        compat: Option<String>,
    },
    /// Sync the rule list into the rules collection and request sign-off
    PublishRules {
        /// Rule list file (overrides the config)
        #[clap(long)]
        rules: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Validate {
            rules,
            schema,
            schema_version,
        } => {
            tracing::info!(command = "validate", "Starting rule list validation");
            let rules = rules.unwrap_or_else(|| config.rules.path.clone());
            let schema = schema.unwrap_or_else(|| config.rules.schema.clone());
            let version = schema_version.unwrap_or(config.rules.schema_version);
            run_validate(&rules, &schema, version).await
        }
        Commands::SyncBrowsers { compat } => {
            tracing::info!(command = "sync-browsers", "Starting browsers synchronisation");
            run_sync_browsers(&config, compat).await
        }
        Commands::PublishRules { rules } => {
            tracing::info!(command = "publish-rules", "Starting rule list publication");
            let rules = rules.unwrap_or_else(|| config.rules.path.clone());
            run_publish_rules(&config, &rules).await
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn run_validate(rules: &Path, schema: &Path, version: SchemaVersion) -> Result<()> {
    let label = file_label(rules);
    let text = tokio::fs::read_to_string(rules)
        .await
        .with_context(|| format!("Failed to read rule list {}", rules.display()))?;
    let schema_text = tokio::fs::read_to_string(schema)
        .await
        .with_context(|| format!("Failed to read schema {}", schema.display()))?;
    let schema_doc: serde_json::Value = serde_json::from_str(&schema_text)
        .with_context(|| format!("Schema {} is not valid JSON", schema.display()))?;

    let fetcher = HttpSchemaFetcher::new();
    let report = validate_rule_list(&text, &schema_doc, version, &fetcher)
        .await
        .context("Schema compilation failed")?;

    for problem in report.problems() {
        eprintln!("{problem}");
    }
    if report.is_valid() {
        println!("✅ {label} is valid.");
        return Ok(());
    }

    let reasons = report
        .failure_categories()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    eprintln!("❌ {label} is invalid: {reasons}");
    Err(anyhow::anyhow!("{label} is invalid: {reasons}"))
}

fn remote_config() -> Result<RemoteConfig> {
    RemoteConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "Invalid remote configuration");
        anyhow::Error::new(e)
    })
}

async fn run_sync_browsers(config: &CliConfig, compat: Option<String>) -> Result<()> {
    let remote = remote_config()?;
    let client = RemoteSettingsClient::new(
        &remote,
        &config.remote.bucket,
        &config.remote.browsers_collection,
    )?;
    let source = compat.unwrap_or_else(|| config.compat.source.clone());
    let data = load_compat_data(&source).await?;
    let releases = flatten_releases(&data);

    match synchronise(&releases, &client, &SyncOptions::from(&remote)).await {
        Ok(report) => {
            print_sync_report(&report);
            tracing::info!(command = "sync-browsers", "Synchronisation complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "sync-browsers", error = %e, "Synchronisation failed");
            Err(anyhow::Error::new(e).context("Browsers synchronisation failed"))
        }
    }
}

fn print_sync_report(report: &SyncReport) {
    println!("Results");
    println!("  Added: {}", report.added.len());
    for r in &report.added {
        println!("    {} {} ({}, {})", r.browserid, r.version, r.name, r.status);
    }
    println!("  Updated: {}", report.updated.len());
    for r in &report.updated {
        println!("    {} {} ({}, {})", r.browserid, r.version, r.name, r.status);
    }
    println!("  Removed: {}", report.removed.len());
    for r in &report.removed {
        println!(
            "    {} {} [{}]",
            r.str_field("browserid").unwrap_or("?"),
            r.str_field("version").unwrap_or("?"),
            r.id
        );
    }
    if report.failed > 0 {
        println!("  Failed: {}", report.failed);
    }

    if !report.has_changes() {
        println!("No changes detected");
        return;
    }
    println!("Browsers data synced ✅\nRefreshed records:");
    for r in &report.refreshed {
        println!(
            "    {} {} {} {}",
            r.id,
            r.str_field("browserid").unwrap_or("?"),
            r.str_field("version").unwrap_or("?"),
            r.str_field("status").unwrap_or("?")
        );
    }
    if let Some(status) = report.review {
        println!("Collection moved to {} ✅", status.as_str());
    }
}

async fn run_publish_rules(config: &CliConfig, rules: &Path) -> Result<()> {
    let remote = remote_config()?;
    let text = tokio::fs::read_to_string(rules)
        .await
        .with_context(|| format!("Failed to read rule list {}", rules.display()))?;
    let document: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Rule list {} is not valid JSON", rules.display()))?;
    let records = rule_records(&document)?;

    let client =
        RemoteSettingsClient::new(&remote, &config.remote.bucket, &config.remote.rules_collection)?;
    let options = PublishOptions {
        bucket: config.remote.bucket.clone(),
        collection: config.remote.rules_collection.clone(),
        dry_run: remote.dry_run,
    };
    let report = publish_rules(&records, &client, &options)
        .await
        .context("Rule list publication failed")?;

    let changes = report.applied.change_count();
    match report.signoff {
        _ if changes == 0 => println!("Records are in sync. Nothing to do."),
        SignoffAction::Nothing => println!("Done. {changes} changes applied."),
        SignoffAction::Approve => println!("Done. {changes} changes applied and signed."),
        SignoffAction::RequestReview => println!("Done. Requested review for {changes} changes."),
    }
    if report.applied.failed > 0 {
        println!("{} operations were rejected by the server.", report.applied.failed);
    }
    Ok(())
}
