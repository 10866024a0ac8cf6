//! Filter and sort vocabulary shared by every adapter

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// A single atomic filter operand.
///
/// Serializes untagged, so `Text("admin")` crosses the wire as `"admin"`
/// and `Number(5.0)` as `5`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Number(f64),
    Text(String),
    DateTime(DateTime<Utc>),
}

impl ScalarValue {
    /// Strict equality against a raw record value.
    ///
    /// Numbers compare numerically, datetimes compare against RFC 3339
    /// strings or epoch-millisecond numbers. No substring semantics here;
    /// that rule lives in the string-scalar filter branch.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Bool(b) => value.as_bool() == Some(*b),
            Self::Number(n) => value.as_f64() == Some(*n),
            Self::Text(s) => value.as_str() == Some(s.as_str()),
            Self::DateTime(dt) => parse_datetime(value).is_some_and(|v| v == *dt),
        }
    }

    /// Render as a query-string value (RFC 3339 for datetimes).
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::DateTime(dt) => dt.to_rfc3339(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<u32> for ScalarValue {
    fn from(v: u32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<DateTime<Utc>> for ScalarValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}

/// Inclusive numeric bounds; a missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct NumberRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl NumberRange {
    pub fn new(min: impl Into<Option<f64>>, max: impl Into<Option<f64>>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// Inclusive datetime bounds; a missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(
        start: impl Into<Option<DateTime<Utc>>>,
        end: impl Into<Option<DateTime<Utc>>>,
    ) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn contains(&self, value: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| value >= start) && self.end.is_none_or(|end| value <= end)
    }
}

/// The value side of a filter entry.
///
/// Each adapter matches on this exhaustively when translating filters:
/// a scalar is an equality (or substring, for strings against strings)
/// test, a list is a membership test, and a range is an inclusive bounds
/// check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(ScalarValue),
    List(Vec<ScalarValue>),
    NumberRange(NumberRange),
    DateRange(DateRange),
}

impl FilterValue {
    pub fn scalar(value: impl Into<ScalarValue>) -> Self {
        Self::Scalar(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ScalarValue>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    pub fn number_range(min: impl Into<Option<f64>>, max: impl Into<Option<f64>>) -> Self {
        Self::NumberRange(NumberRange::new(min, max))
    }

    pub fn date_range(
        start: impl Into<Option<DateTime<Utc>>>,
        end: impl Into<Option<DateTime<Utc>>>,
    ) -> Self {
        Self::DateRange(DateRange::new(start, end))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

macro_rules! scalar_filter_from {
    ($($ty:ty),+) => {
        $(impl From<$ty> for FilterValue {
            fn from(value: $ty) -> Self {
                Self::Scalar(value.into())
            }
        })+
    };
}

scalar_filter_from!(bool, f64, i64, i32, u32, &str, String, DateTime<Utc>);

impl From<ScalarValue> for FilterValue {
    fn from(value: ScalarValue) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<ScalarValue>> for FilterValue {
    fn from(values: Vec<ScalarValue>) -> Self {
        Self::List(values)
    }
}

impl From<NumberRange> for FilterValue {
    fn from(range: NumberRange) -> Self {
        Self::NumberRange(range)
    }
}

impl From<DateRange> for FilterValue {
    fn from(range: DateRange) -> Self {
        Self::DateRange(range)
    }
}

/// Sort order for a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn is_ascending(self) -> bool {
        matches!(self, Self::Asc)
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sort key. Position in the query's sort sequence is significant:
/// the first entry is the primary key, later entries break ties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortEntry {
    pub column: String,
    pub direction: SortDirection,
}

impl SortEntry {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Best-effort datetime coercion for record values: RFC 3339 strings,
/// bare dates, or epoch milliseconds.
pub(crate) fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            }),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}
