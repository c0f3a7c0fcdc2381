//! # validate: rule list validation
//!
//! Validation runs in four stages and reports every stage that failed, not
//! only the first:
//!   1. JSON parsing (when this fails nothing else can run)
//!   2. schema validation, collecting every violation in one pass
//!   3. duplicate ids and duplicate domains
//!   4. empty rules (no cookie injection and no click presence marker)
//!
//! The semantic stages work on the typed [`Rule`] model. If the document does
//! not have that shape (which the schema stage will already have reported)
//! the semantic stages are skipped and the shape problem is recorded.
//!
//! The entrypoint is [`validate_rule_list`]; [`find_duplicates`] and
//! [`find_empty_rules`] are usable on their own.

use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::contract::SchemaFetcher;
use crate::error::SchemaError;
use crate::rules::{Rule, RuleList, SchemaVersion};
use crate::schema::{compile_schema, SchemaViolation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateId {
    pub index: usize,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateDomains {
    pub index: usize,
    pub id: String,
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyRule {
    pub index: usize,
    pub id: String,
}

impl fmt::Display for DuplicateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duplicate id {} for rule #{}", self.id, self.index)
    }
}

impl fmt::Display for DuplicateDomains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Duplicate domain/s for rule #{} ({}): {}",
            self.index,
            self.id,
            self.domains.join(", ")
        )
    }
}

impl fmt::Display for EmptyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Empty rule rule #{} id: {}", self.index, self.id)
    }
}

/// The kinds of failure a report can carry, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    InvalidJson,
    SchemaValidation,
    UnexpectedShape,
    DuplicateRules,
    EmptyRules,
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureCategory::InvalidJson => "Invalid JSON",
            FailureCategory::SchemaValidation => "Schema validation error",
            FailureCategory::UnexpectedShape => "Unexpected rule list shape",
            FailureCategory::DuplicateRules => "Found duplicate rules",
            FailureCategory::EmptyRules => "Found empty rules",
        };
        f.write_str(text)
    }
}

/// Everything found wrong with a rule list.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub rule_count: usize,
    pub parse_error: Option<String>,
    pub schema_violations: Vec<SchemaViolation>,
    pub shape_error: Option<String>,
    pub duplicate_ids: Vec<DuplicateId>,
    pub duplicate_domains: Vec<DuplicateDomains>,
    pub empty_rules: Vec<EmptyRule>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.failure_categories().is_empty()
    }

    pub fn failure_categories(&self) -> Vec<FailureCategory> {
        let mut categories = Vec::new();
        if self.parse_error.is_some() {
            categories.push(FailureCategory::InvalidJson);
        }
        if !self.schema_violations.is_empty() {
            categories.push(FailureCategory::SchemaValidation);
        }
        if self.shape_error.is_some() {
            categories.push(FailureCategory::UnexpectedShape);
        }
        if !self.duplicate_ids.is_empty() || !self.duplicate_domains.is_empty() {
            categories.push(FailureCategory::DuplicateRules);
        }
        if !self.empty_rules.is_empty() {
            categories.push(FailureCategory::EmptyRules);
        }
        categories
    }

    /// One human readable line per individual problem.
    pub fn problems(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(e) = &self.parse_error {
            lines.push(format!("Error while parsing rule list: {e}"));
        }
        lines.extend(
            self.schema_violations
                .iter()
                .map(|v| format!("Rule list validation error at {v}")),
        );
        if let Some(e) = &self.shape_error {
            lines.push(format!("Rule list has an unexpected shape: {e}"));
        }
        lines.extend(self.duplicate_ids.iter().map(ToString::to_string));
        lines.extend(self.duplicate_domains.iter().map(ToString::to_string));
        lines.extend(self.empty_rules.iter().map(ToString::to_string));
        lines
    }
}

/// Validates the raw rule list text against `schema` and the semantic rules.
///
/// Returns `Err` only when the schema itself cannot be loaded or compiled;
/// problems with the rule list are reported through the [`ValidationReport`].
pub async fn validate_rule_list<F>(
    text: &str,
    schema: &Value,
    version: SchemaVersion,
    fetcher: &F,
) -> Result<ValidationReport, SchemaError>
where
    F: SchemaFetcher + ?Sized,
{
    let mut report = ValidationReport::default();

    let document: Value = match serde_json::from_str(text) {
        Ok(doc) => doc,
        Err(e) => {
            error!(error = %e, "[VALIDATE] Rule list is not valid JSON");
            report.parse_error = Some(e.to_string());
            return Ok(report);
        }
    };

    let compiled = compile_schema(schema, fetcher).await?;
    report.schema_violations = compiled.violations(&document);
    if !report.schema_violations.is_empty() {
        warn!(
            violations = report.schema_violations.len(),
            "[VALIDATE] Rule list does not match schema"
        );
    }

    check_semantics(&document, version, &mut report);

    info!(
        rules = report.rule_count,
        valid = report.is_valid(),
        "[VALIDATE] Validation finished"
    );
    Ok(report)
}

/// Runs the duplicate and emptiness checks on an already parsed document.
pub fn check_semantics(document: &Value, version: SchemaVersion, report: &mut ValidationReport) {
    let rule_list = match RuleList::deserialize(document) {
        Ok(list) => list,
        Err(e) => {
            warn!(error = %e, "[VALIDATE] Skipping semantic checks");
            report.shape_error = Some(e.to_string());
            return;
        }
    };
    report.rule_count = rule_list.data.len();

    let (ids, domains) = find_duplicates(&rule_list.data, version);
    report.duplicate_ids = ids;
    report.duplicate_domains = domains;
    report.empty_rules = find_empty_rules(&rule_list.data);
}

/// Reports every recurrence of an id or a domain, in document order.
///
/// A rule's id and domains are added to the seen sets after it has been
/// checked, whether or not it was a duplicate, so the third occurrence of a
/// value is reported just like the second.
pub fn find_duplicates(
    rules: &[Rule],
    version: SchemaVersion,
) -> (Vec<DuplicateId>, Vec<DuplicateDomains>) {
    let mut seen_ids: HashSet<&str> = HashSet::new();
    let mut seen_domains: HashSet<&str> = HashSet::new();
    let mut duplicate_ids = Vec::new();
    let mut duplicate_domains = Vec::new();

    for (index, rule) in rules.iter().enumerate() {
        if seen_ids.contains(rule.id.as_str()) {
            error!(index, id = %rule.id, "[VALIDATE] Duplicate id");
            duplicate_ids.push(DuplicateId {
                index,
                id: rule.id.clone(),
            });
        }

        let domains = rule.unique_domains(version);
        let repeated: Vec<String> = domains
            .iter()
            .filter(|d| seen_domains.contains(*d))
            .map(|d| d.to_string())
            .collect();
        if !repeated.is_empty() {
            error!(index, id = %rule.id, domains = ?repeated, "[VALIDATE] Duplicate domains");
            duplicate_domains.push(DuplicateDomains {
                index,
                id: rule.id.clone(),
                domains: repeated,
            });
        }

        seen_ids.insert(rule.id.as_str());
        seen_domains.extend(domains);
    }

    (duplicate_ids, duplicate_domains)
}

/// Rules other than the disabled sentinel that neither inject cookies nor
/// detect a banner.
pub fn find_empty_rules(rules: &[Rule]) -> Vec<EmptyRule> {
    rules
        .iter()
        .enumerate()
        .filter(|(_, rule)| !rule.is_disabled_sentinel() && !rule.has_action())
        .map(|(index, rule)| {
            error!(index, id = %rule.id, "[VALIDATE] Empty rule");
            EmptyRule {
                index,
                id: rule.id.clone(),
            }
        })
        .collect()
}
