//! Pluggable source adapters
//!
//! Each adapter knows how to validate a connection's configuration and how to
//! fetch one scalar value from one kind of external source. The set of kinds
//! is closed: adding a new one means extending [`AdapterKind`], the catalog
//! and [`build_adapter`].
//!
//! ## Contract
//!
//! 1. `validate` is structural only and performs no I/O; it accumulates every
//!    violation instead of stopping at the first.
//! 2. `fetch` is one round trip from the caller's perspective and never
//!    panics across the boundary; all failure is a typed [`FetchError`].

pub mod dashboard_view;
pub mod json_path;
pub mod search_query;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::ConnectionConfig;
use crate::error::{FetchError, FetchResult};

/// The closed set of adapter kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterKind {
    JsonPath,
    SearchQuery,
    DashboardView,
}

impl AdapterKind {
    /// Enumerable catalog of adapter type names, for configuration UIs.
    pub const CATALOG: [AdapterKind; 3] = [
        AdapterKind::JsonPath,
        AdapterKind::SearchQuery,
        AdapterKind::DashboardView,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AdapterKind::JsonPath => "json-path",
            AdapterKind::SearchQuery => "search-query",
            AdapterKind::DashboardView => "dashboard-view",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        AdapterKind::CATALOG.into_iter().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability interface implemented by every adapter kind.
///
/// Implementations must be `Send + Sync` as each lives inside an async worker
/// task for the lifetime of its connection.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn kind(&self) -> AdapterKind;

    /// Structural validation of a connection's configuration.
    ///
    /// Checks URL well-formedness, credential pairing, polling period and the
    /// adapter-specific required parameters. Never touches the network.
    fn validate(&self, config: &ConnectionConfig) -> ValidationReport;

    /// Fetch one scalar value from the configured source.
    async fn fetch(&self, config: &ConnectionConfig) -> FetchResult<String>;
}

/// Build the adapter for a kind.
pub fn build_adapter(kind: AdapterKind) -> Box<dyn Adapter> {
    match kind {
        AdapterKind::JsonPath => Box::new(json_path::JsonPathAdapter::new()),
        AdapterKind::SearchQuery => Box::new(search_query::SearchQueryAdapter::new()),
        AdapterKind::DashboardView => Box::new(dashboard_view::DashboardViewAdapter::new()),
    }
}

/// Resolve a configured type string to an adapter instance.
pub fn resolve_adapter(kind_name: &str) -> FetchResult<Box<dyn Adapter>> {
    AdapterKind::from_name(kind_name)
        .map(build_adapter)
        .ok_or_else(|| FetchError::UnknownAdapterType(kind_name.to_string()))
}

/// Itemized outcome of validating a connection configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub success: bool,
    pub message: String,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<String>) -> Self {
        let success = errors.is_empty();
        let message = if success {
            String::from("configuration is valid")
        } else {
            format!("configuration has {} problem(s)", errors.len())
        };

        Self {
            success,
            message,
            errors,
        }
    }
}

/// Validate a configuration against its configured adapter type.
///
/// Used synchronously by configuration editors before a connection is
/// persisted. An unknown type is itself a validation error; the structural
/// checks still run so the caller sees every problem at once.
pub fn validate_connection(config: &ConnectionConfig) -> ValidationReport {
    match AdapterKind::from_name(&config.kind) {
        Some(kind) => build_adapter(kind).validate(config),
        None => {
            let mut errors = vec![format!("unknown adapter type '{}'", config.kind)];
            structural_checks(config, &mut errors);
            ValidationReport::from_errors(errors)
        }
    }
}

/// Checks shared by every adapter kind.
pub(crate) fn structural_checks(config: &ConnectionConfig, errors: &mut Vec<String>) {
    if let Err(e) = reqwest::Url::parse(&config.url) {
        errors.push(format!("invalid endpoint URL '{}': {e}", config.url));
    }

    match (&config.username, &config.auth_token) {
        (Some(_), None) => {
            errors.push(String::from("username is set but authToken is missing"));
        }
        (None, Some(_)) => {
            errors.push(String::from("authToken is set but username is missing"));
        }
        _ => {}
    }

    if config.polling_period_seconds <= 0 {
        errors.push(format!(
            "pollingPeriodSeconds must be strictly positive (got {})",
            config.polling_period_seconds
        ));
    }
}

/// Attach basic-auth credentials when both halves are configured.
pub(crate) fn apply_auth(
    request: reqwest::RequestBuilder,
    config: &ConnectionConfig,
) -> reqwest::RequestBuilder {
    match (&config.username, &config.auth_token) {
        (Some(username), Some(token)) => request.basic_auth(username, Some(token)),
        _ => request,
    }
}

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client")
}
