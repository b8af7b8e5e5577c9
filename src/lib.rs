pub mod adapters;
pub mod config;
pub mod error;
pub mod notify;
pub mod sync;
pub mod update;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the stored text of a quantity's current value is interpreted by readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Integer,
    Real,
    Text,
}

impl ValueType {
    /// Interpret raw value text according to this type.
    ///
    /// Text that does not parse as the declared type is kept verbatim as
    /// `QuantityValue::Text` so that no reading is lost on conversion.
    pub fn convert(&self, raw: &str) -> QuantityValue {
        match self {
            ValueType::Integer => raw
                .trim()
                .parse()
                .map(QuantityValue::Integer)
                .unwrap_or_else(|_| QuantityValue::Text(raw.to_string())),
            ValueType::Real => raw
                .trim()
                .parse()
                .map(QuantityValue::Real)
                .unwrap_or_else(|_| QuantityValue::Text(raw.to_string())),
            ValueType::Text => QuantityValue::Text(raw.to_string()),
        }
    }
}

/// A typed value as it appears in history records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuantityValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

/// A tracked KPI: the latest known value plus its typed interpretation.
///
/// The current value is always stored as text; `value_type` tells readers how
/// to interpret it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quantity {
    pub id: String,
    pub current_value: String,
    pub value_type: ValueType,
    pub last_updated: DateTime<Utc>,
}

/// Immutable snapshot of a quantity's value, taken at the moment it was
/// superseded by a newer one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub quantity_id: String,
    pub value: QuantityValue,
    pub recorded_at: DateTime<Utc>,
}
