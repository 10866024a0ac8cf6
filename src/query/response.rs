//! Records, identity keys, and the normalized fetch result

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A row, as every backend ultimately hands it over: a JSON object.
pub type Record = Map<String, Value>;

/// The identity of a record under the adapter's key field.
///
/// Backends disagree on key representation (UUID strings, integer serial
/// columns), so both shapes are first-class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Text(String),
    Int(i64),
}

impl RecordKey {
    /// Extract a key from a raw record value.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(Self::Int),
            _ => None,
        }
    }

    /// Whether a raw record value is this key.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Text(s), Value::String(v)) => s == v,
            (Self::Int(i), Value::Number(v)) => v.as_i64() == Some(*i),
            _ => false,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Int(i) => Value::Number((*i).into()),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for RecordKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for RecordKey {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

/// The normalized result of a fetch.
///
/// `total` counts matches across all pages, not the returned slice, so
/// `data.len() <= total` and `data.len() <= page_size` always hold.
/// Field names follow the shared wire envelope (`pageSize`), which lets
/// remote adapters deserialize conforming envelopes directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    pub data: Vec<Record>,
    pub total: u64,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(rename = "pageSize", default)]
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<Map<String, Value>>,
}

fn default_page() -> u32 {
    1
}

impl DataResponse {
    /// Wrap an unsliced row set as a single page.
    pub fn single_page(data: Vec<Record>) -> Self {
        let total = data.len() as u64;
        Self {
            data,
            total,
            page: 1,
            page_size: total as u32,
            metadata: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
