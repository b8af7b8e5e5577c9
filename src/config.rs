use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, trace};

/// The connection registry document.
///
/// Loaded once at start-up; incremental changes are pushed to the supervisor
/// via [`crate::sync::supervisor::Supervisor::on_connection_changed`].
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

/// One named binding from an external data source to a tracked quantity.
///
/// The adapter type is kept as a free string so that a registry containing an
/// unknown type still loads; resolution happens when the connection is
/// scheduled or validated.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub name: String,

    /// Id of the quantity this connection feeds.
    pub element_id: String,

    #[serde(rename = "type")]
    pub kind: String,

    /// Adapter-specific parameters (query path, view id, request body, ...).
    #[serde(default)]
    pub parameters: Map<String, Value>,

    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    #[serde(default = "default_polling_period")]
    pub polling_period_seconds: i64,

    #[serde(default = "default_enable")]
    pub enable: bool,
}

impl ConnectionConfig {
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// A non-empty, trimmed string parameter.
    pub fn parameter_str(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn default_polling_period() -> i64 {
    60
}

fn default_enable() -> bool {
    true
}

/// Read the registry from a JSON file.
///
/// A missing file is not an error; the engine simply starts with zero
/// connections. A present but malformed file is.
pub fn read_registry_file(path: &str) -> anyhow::Result<Registry> {
    if !Path::new(path).exists() {
        debug!("registry file {path} not found, starting with empty registry");
        return Ok(Registry::default());
    }

    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("invalid registry file {path}: {e}"))
        .inspect(|registry| trace!("loaded registry: {registry:?}"))
}
