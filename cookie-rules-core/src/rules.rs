//! Rule list data model.
//!
//! A rule list document is `{ "data": [Rule, ...] }`. Only the fields the
//! semantic checks look at are typed; everything else is kept in `extra`.
//! Serializing keeps unknown fields but omits empty `domains` and empty cookie
//! lists. The publisher works on the raw document, not on this model.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Id of the rule which lists every site the mechanism is disabled for.
pub const RULE_ID_DISABLED: &str = "disabled";

/// Domain value the legacy single-domain layout uses for global rules.
pub const GLOBAL_DOMAIN_MARKER: &str = "*";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleList {
    #[serde(default)]
    pub data: Vec<Rule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,
    /// Legacy single-domain layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<CookieRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click: Option<ClickRule>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CookieRules {
    #[serde(rename = "optIn", default, skip_serializing_if = "Vec::is_empty")]
    pub opt_in: Vec<Value>,
    #[serde(rename = "optOut", default, skip_serializing_if = "Vec::is_empty")]
    pub opt_out: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClickRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The two historical rule list layouts. They disagree on how a rule names
/// its domains and on what marks a rule as global, so a run picks exactly one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaVersion {
    /// `domains: [..]`; an empty array marks a global rule.
    #[default]
    DomainsArray,
    /// `domain: ".."`; the value `"*"` marks a global rule.
    SingleDomain,
}

impl FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "domains-array" | "domains_array" | "domains" => Ok(SchemaVersion::DomainsArray),
            "single-domain" | "single_domain" | "domain" => Ok(SchemaVersion::SingleDomain),
            other => Err(format!(
                "unknown schema version {other:?}, expected domains-array or single-domain"
            )),
        }
    }
}

impl Rule {
    pub fn is_disabled_sentinel(&self) -> bool {
        self.id == RULE_ID_DISABLED
    }

    /// Domains that take part in uniqueness checks under `version`.
    /// Global markers never do.
    pub fn unique_domains(&self, version: SchemaVersion) -> Vec<&str> {
        match version {
            SchemaVersion::DomainsArray => self.domains.iter().map(String::as_str).collect(),
            SchemaVersion::SingleDomain => self
                .domain
                .as_deref()
                .filter(|d| *d != GLOBAL_DOMAIN_MARKER)
                .into_iter()
                .collect(),
        }
    }

    /// True when the rule injects cookies or detects a banner.
    pub fn has_action(&self) -> bool {
        let cookies = self
            .cookies
            .as_ref()
            .is_some_and(|c| !c.opt_in.is_empty() || !c.opt_out.is_empty());
        let presence = self
            .click
            .as_ref()
            .and_then(|c| c.presence.as_deref())
            .is_some_and(|p| !p.is_empty());
        cookies || presence
    }
}
