//! JSON-path-over-HTTP adapter
//!
//! Issues one GET against the configured endpoint and extracts a single
//! scalar from the JSON body using the `path` parameter. The supported path
//! grammar is the subset the dashboards actually use: `$`, dot fields and
//! numeric indexes (`$.a.b[0].c`).

use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;

use crate::config::ConnectionConfig;
use crate::error::{FetchError, FetchResult};

use super::{Adapter, AdapterKind, ValidationReport, apply_auth, http_client, structural_checks};

pub struct JsonPathAdapter {
    client: reqwest::Client,
}

impl JsonPathAdapter {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl Default for JsonPathAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for JsonPathAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::JsonPath
    }

    fn validate(&self, config: &ConnectionConfig) -> ValidationReport {
        let mut errors = Vec::new();
        structural_checks(config, &mut errors);

        if config.parameter_str("path").is_none() {
            errors.push(String::from("missing required parameter 'path'"));
        }

        ValidationReport::from_errors(errors)
    }

    async fn fetch(&self, config: &ConnectionConfig) -> FetchResult<String> {
        let path = config
            .parameter_str("path")
            .ok_or_else(|| FetchError::Extraction(String::from("missing 'path' parameter")))?;

        trace!("requesting {} for path {path}", config.url);

        let response = apply_auth(self.client.get(&config.url), config)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Http(response.status().as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

        // A non-matching path is not a failure: the quantity simply reads as
        // empty until the source starts producing the field.
        Ok(eval_path(&body, path)
            .map(scalar_to_string)
            .unwrap_or_default())
    }
}

/// Evaluate a `$.a.b[0]` style path against a parsed document.
///
/// Returns the first (and only, in this grammar) matching value.
pub fn eval_path<'a>(root: &'a Value, expr: &str) -> Option<&'a Value> {
    let expr = expr.trim();
    let expr = expr.strip_prefix('$').unwrap_or(expr);

    let mut current = root;
    for part in expr.split('.').filter(|p| !p.is_empty()) {
        let (field, indexes) = split_indexes(part)?;
        if !field.is_empty() {
            current = current.get(field)?;
        }
        for index in indexes {
            current = current.get(index)?;
        }
    }

    Some(current)
}

/// Split `name[0][1]` into the field name and its index suffixes.
fn split_indexes(part: &str) -> Option<(&str, Vec<usize>)> {
    let Some(pos) = part.find('[') else {
        return Some((part, Vec::new()));
    };

    let field = &part[..pos];
    let mut indexes = Vec::new();
    let mut rest = &part[pos..];

    while let Some(stripped) = rest.strip_prefix('[') {
        let close = stripped.find(']')?;
        indexes.push(stripped[..close].parse().ok()?);
        rest = &stripped[close + 1..];
    }

    rest.is_empty().then_some((field, indexes))
}

/// Render a matched value as the scalar text stored for the quantity.
///
/// Strings are taken verbatim; everything else keeps its JSON rendering.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
