//! Schema compilation with remote `$ref` resolution.
//!
//! `jsonschema` resolves references synchronously through its `Retrieve` trait,
//! while fetching goes through the async [`SchemaFetcher`]. Compilation therefore
//! runs in two steps: every absolute http(s) `$ref` reachable from the root
//! schema is fetched up front (each URI once), then the compiler is handed a
//! retriever that serves those documents from memory.

use std::collections::{HashMap, HashSet, VecDeque};

use jsonschema::{Retrieve, Uri, Validator};
use serde_json::Value;
use tracing::{debug, info};

use crate::contract::SchemaFetcher;
use crate::error::SchemaError;

/// A single schema violation, located by JSON pointer into the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub instance_path: String,
    pub message: String,
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.instance_path.is_empty() {
            "/"
        } else {
            &self.instance_path
        };
        write!(f, "{path}: {}", self.message)
    }
}

/// A compiled rule list schema.
pub struct CompiledSchema {
    validator: Validator,
}

impl CompiledSchema {
    /// Collects every violation in one pass.
    pub fn violations(&self, instance: &Value) -> Vec<SchemaViolation> {
        self.validator
            .iter_errors(instance)
            .map(|e| SchemaViolation {
                instance_path: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect()
    }
}

/// Fetches the external references of `schema` and compiles it.
pub async fn compile_schema<F>(schema: &Value, fetcher: &F) -> Result<CompiledSchema, SchemaError>
where
    F: SchemaFetcher + ?Sized,
{
    let documents = prefetch_references(schema, fetcher).await?;
    info!(
        prefetched = documents.len(),
        "[VALIDATE] Resolved external schema references"
    );
    let validator = jsonschema::options()
        .with_retriever(PrefetchedSchemas { documents })
        .build(schema)
        .map_err(|e| SchemaError::Compile(e.to_string()))?;
    Ok(CompiledSchema { validator })
}

/// Breadth-first fetch of every external reference, following references
/// inside fetched documents as well.
pub async fn prefetch_references<F>(
    schema: &Value,
    fetcher: &F,
) -> Result<HashMap<String, Value>, SchemaError>
where
    F: SchemaFetcher + ?Sized,
{
    let mut documents = HashMap::new();
    let mut seen = HashSet::new();
    // A root `$id` names the root itself, which is never fetched.
    if let Some(id) = schema.get("$id").and_then(Value::as_str) {
        if let Some(own) = resolve_reference(None, id) {
            seen.insert(own);
        }
    }
    let mut queue: VecDeque<String> = external_references(schema).into();

    while let Some(uri) = queue.pop_front() {
        if !seen.insert(uri.clone()) {
            continue;
        }
        debug!(uri = %uri, "[VALIDATE] Fetching external schema");
        let document = fetcher.fetch_schema(&uri).await?;
        queue.extend(references_from(&document, Some(uri.as_str())));
        documents.insert(uri, document);
    }
    Ok(documents)
}

/// Absolute http(s) `$ref` targets in `value`, without fragments, in
/// document order and deduplicated.
///
/// Relative references are resolved against the closest enclosing `$id`. A
/// relative reference with no absolute base is left to the compiler.
pub fn external_references(value: &Value) -> Vec<String> {
    references_from(value, None)
}

/// Like [`external_references`], for a document fetched from `retrieved_from`.
/// The fetch URI is the base until a `$id` overrides it.
pub fn references_from(value: &Value, retrieved_from: Option<&str>) -> Vec<String> {
    let mut found = Vec::new();
    collect_references(value, retrieved_from.map(str::to_string), &mut found);
    let mut seen = HashSet::new();
    found.retain(|uri| seen.insert(uri.clone()));
    found
}

fn collect_references(value: &Value, base: Option<String>, found: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            let base = match map.get("$id").and_then(Value::as_str) {
                Some(id) => resolve_reference(base.as_deref(), id).or(base),
                None => base,
            };
            for (key, child) in map {
                match (key.as_str(), child) {
                    ("$ref", Value::String(target)) => {
                        if let Some(uri) = resolve_reference(base.as_deref(), target) {
                            found.push(uri);
                        }
                    }
                    _ => collect_references(child, base.clone(), found),
                }
            }
        }
        Value::Array(items) => items
            .iter()
            .for_each(|item| collect_references(item, base.clone(), found)),
        _ => {}
    }
}

fn is_http(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}

/// Resolves `reference` against `base` (RFC 3986, section 5.2) and returns
/// the absolute http(s) URI without its fragment. Fragment-only references,
/// non-http schemes and relative references without an http(s) base give
/// `None`.
pub fn resolve_reference(base: Option<&str>, reference: &str) -> Option<String> {
    let reference = strip_fragment(reference);
    if reference.is_empty() {
        return None;
    }
    if is_http(reference) {
        return Some(reference.to_string());
    }
    let scheme_end = reference.find(':');
    let first_delimiter = reference.find(|c: char| c == '/' || c == '?');
    if let Some(colon) = scheme_end {
        if first_delimiter.map_or(true, |d| colon < d) {
            return None;
        }
    }

    let base = strip_fragment(base.filter(|b| is_http(b))?);
    let (origin, base_path) = split_origin(base);
    let base_path = base_path.split_once('?').map_or(base_path, |(p, _)| p);

    if let Some(network_path) = reference.strip_prefix("//") {
        let scheme = &origin[..origin.find("://")?];
        return Some(format!("{scheme}://{network_path}"));
    }

    let (path, query) = match reference.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (reference, None),
    };
    let merged = if path.is_empty() {
        base_path.to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        let directory = base_path.rfind('/').map_or("/", |i| &base_path[..=i]);
        format!("{directory}{path}")
    };

    let mut resolved = format!("{origin}{}", remove_dot_segments(&merged));
    if let Some(query) = query {
        resolved.push('?');
        resolved.push_str(query);
    } else if path.is_empty() {
        if let Some((_, base_query)) = base.split_once('?') {
            resolved.push('?');
            resolved.push_str(base_query);
        }
    }
    Some(resolved)
}

/// Splits `scheme://authority` from the rest of an absolute URI.
fn split_origin(uri: &str) -> (&str, &str) {
    let authority_start = uri.find("://").map_or(0, |i| i + 3);
    match uri[authority_start..].find(|c: char| c == '/' || c == '?') {
        Some(i) => uri.split_at(authority_start + i),
        None => (uri, ""),
    }
}

fn remove_dot_segments(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let mut output: Vec<&str> = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        match *segment {
            "." => {
                if last {
                    output.push("");
                }
            }
            ".." => {
                if output.len() > 1 {
                    output.pop();
                }
                if last {
                    output.push("");
                }
            }
            other => output.push(other),
        }
    }
    let joined = output.join("/");
    if joined.starts_with('/') {
        joined
    } else {
        format!("/{joined}")
    }
}

fn strip_fragment(uri: &str) -> &str {
    uri.split_once('#').map_or(uri, |(base, _)| base)
}

struct PrefetchedSchemas {
    documents: HashMap<String, Value>,
}

impl Retrieve for PrefetchedSchemas {
    fn retrieve(
        &self,
        uri: &Uri<String>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let key = strip_fragment(uri.as_str());
        self.documents
            .get(key)
            .cloned()
            .ok_or_else(|| format!("schema {key} is not reachable from the root schema").into())
    }
}
