//! LocalAdapter — reference semantics over an in-memory collection
//!
//! This adapter defines the filter, search, and sort behavior the remote
//! adapters approximate when they delegate to a backend. It owns its rows;
//! every operation is async only for contract uniformity.

use crate::adapter::traits::{DataAdapter, Operation};
use crate::error::{AdapterError, AdapterResult};
use crate::query::{
    parse_datetime, DataQuery, DataResponse, FilterValue, Record, RecordKey, ScalarValue,
    SortEntry,
};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Replaces the per-field filter matching step wholesale.
pub type FilterFn = Arc<dyn Fn(&Record, &DataQuery) -> bool + Send + Sync>;

/// Replaces the multi-key comparison step wholesale.
pub type SortFn = Arc<dyn Fn(&Record, &Record, &[SortEntry]) -> Ordering + Send + Sync>;

/// In-memory adapter over a `Vec<Record>`.
///
/// Rows keep insertion order; an unsorted query returns them as inserted.
/// Without `page_size` the whole matched set comes back as a single page.
pub struct LocalAdapter {
    rows: RwLock<Vec<Record>>,
    key_field: String,
    search_fields: Option<Vec<String>>,
    case_insensitive: bool,
    filter_fn: Option<FilterFn>,
    sort_fn: Option<SortFn>,
}

impl LocalAdapter {
    pub fn new(rows: Vec<Record>) -> Self {
        Self {
            rows: RwLock::new(rows),
            key_field: "id".to_string(),
            search_fields: None,
            case_insensitive: true,
            filter_fn: None,
            sort_fn: None,
        }
    }

    /// Identity field for update/delete targeting (default `"id"`).
    pub fn with_key_field(mut self, key_field: impl Into<String>) -> Self {
        self.key_field = key_field.into();
        self
    }

    /// Restrict free-text search to these fields. Unset, the field set is
    /// inferred from the first row — so an empty collection matches
    /// nothing.
    pub fn with_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Make substring filters and search case-sensitive.
    pub fn case_sensitive(mut self) -> Self {
        self.case_insensitive = false;
        self
    }

    pub fn with_filter_fn(mut self, filter_fn: FilterFn) -> Self {
        self.filter_fn = Some(filter_fn);
        self
    }

    pub fn with_sort_fn(mut self, sort_fn: SortFn) -> Self {
        self.sort_fn = Some(sort_fn);
        self
    }

    /// A copy of the current rows.
    pub async fn snapshot(&self) -> Vec<Record> {
        self.rows.read().await.clone()
    }

    /// Swap out the backing collection.
    pub async fn replace(&self, rows: Vec<Record>) {
        *self.rows.write().await = rows;
    }

    fn passes_filters(&self, row: &Record, query: &DataQuery) -> bool {
        if let Some(filter_fn) = &self.filter_fn {
            return filter_fn(row, query);
        }
        query.filters.iter().all(|(field, filter)| {
            self.field_matches(row.get(field).unwrap_or(&Value::Null), filter)
        })
    }

    fn field_matches(&self, value: &Value, filter: &FilterValue) -> bool {
        match filter {
            FilterValue::List(candidates) => candidates.iter().any(|c| c.matches(value)),
            FilterValue::NumberRange(range) => {
                value.as_f64().is_some_and(|n| range.contains(n))
            }
            FilterValue::DateRange(range) => {
                parse_datetime(value).is_some_and(|dt| range.contains(dt))
            }
            // String against string is a substring test; against anything
            // else it falls back to strict equality.
            FilterValue::Scalar(ScalarValue::Text(needle)) => match value {
                Value::String(hay) => self.contains(hay, needle),
                other => ScalarValue::Text(needle.clone()).matches(other),
            },
            FilterValue::Scalar(scalar) => scalar.matches(value),
        }
    }

    fn passes_search(&self, row: &Record, fields: &[String], needle: &str) -> bool {
        fields.iter().any(|field| {
            match row.get(field) {
                Some(Value::Null) | None => false,
                Some(Value::String(s)) => self.contains(s, needle),
                Some(other) => self.contains(&other.to_string(), needle),
            }
        })
    }

    fn contains(&self, haystack: &str, needle: &str) -> bool {
        if self.case_insensitive {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        } else {
            haystack.contains(needle)
        }
    }

    fn compare(&self, a: &Record, b: &Record, sort: &[SortEntry]) -> Ordering {
        if let Some(sort_fn) = &self.sort_fn {
            return sort_fn(a, b, sort);
        }
        for entry in sort {
            let av = a.get(&entry.column).filter(|v| !v.is_null());
            let bv = b.get(&entry.column).filter(|v| !v.is_null());
            let ord = match (av, bv) {
                (None, None) => Ordering::Equal,
                // Missing values sort last regardless of direction
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(x), Some(y)) => {
                    let ord = compare_values(x, y);
                    if entry.direction.is_ascending() {
                        ord
                    } else {
                        ord.reverse()
                    }
                }
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    if let (Some(x), Some(y)) = (a.as_bool(), b.as_bool()) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (parse_datetime(a), parse_datetime(b)) {
        return x.cmp(&y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[async_trait]
impl DataAdapter for LocalAdapter {
    async fn fetch(&self, query: &DataQuery) -> AdapterResult<DataResponse> {
        let rows = self.rows.read().await;

        // Search fields are inferred from the first row when unconfigured,
        // so searching an empty collection matches nothing.
        let inferred_fields;
        let search_fields: &[String] = match &self.search_fields {
            Some(fields) => fields,
            None => {
                inferred_fields = rows
                    .first()
                    .map(|row| row.keys().cloned().collect::<Vec<_>>())
                    .unwrap_or_default();
                &inferred_fields
            }
        };

        let mut matched: Vec<Record> = rows
            .iter()
            .filter(|row| self.passes_filters(row, query))
            .filter(|row| match query.search_needle() {
                Some(needle) => self.passes_search(row, search_fields, needle),
                None => true,
            })
            .cloned()
            .collect();
        drop(rows);

        if !query.sort.is_empty() {
            // Vec::sort_by is stable: ties keep insertion order.
            matched.sort_by(|a, b| self.compare(a, b, &query.sort));
        }

        let total = matched.len() as u64;
        let page = query.page.unwrap_or(1).max(1);
        let page_size = query.page_size.unwrap_or(total as u32);
        let data: Vec<Record> = matched
            .into_iter()
            .skip((page as usize - 1) * page_size as usize)
            .take(page_size as usize)
            .collect();

        tracing::debug!(total, page, page_size, returned = data.len(), "local fetch");

        Ok(DataResponse {
            data,
            total,
            page,
            page_size,
            metadata: None,
        })
    }

    fn supports(&self, operation: Operation) -> bool {
        !matches!(operation, Operation::Subscribe)
    }

    async fn create(&self, mut item: Record) -> AdapterResult<Option<Record>> {
        let missing_key = item
            .get(&self.key_field)
            .map_or(true, Value::is_null);
        if missing_key {
            item.insert(
                self.key_field.clone(),
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
        }

        let mut rows = self.rows.write().await;
        rows.push(item.clone());
        Ok(Some(item))
    }

    async fn update(&self, key: &RecordKey, patch: Record) -> AdapterResult<Option<Record>> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|row| key.matches(row.get_key(&self.key_field)))
            .ok_or_else(|| {
                // Deliberately not the NotFound kind: the in-memory adapter
                // predates the taxonomy and callers branch on REST-only
                // NotFound semantics.
                AdapterError::adapter(format!("no record with key {key}"), "UNKNOWN_KEY")
            })?;

        for (field, value) in patch {
            if field != self.key_field {
                row.insert(field, value);
            }
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, key: &RecordKey) -> AdapterResult<()> {
        let mut rows = self.rows.write().await;
        let position = rows
            .iter()
            .position(|row| key.matches(row.get_key(&self.key_field)))
            .ok_or_else(|| {
                AdapterError::adapter(format!("no record with key {key}"), "UNKNOWN_KEY")
            })?;
        rows.remove(position);
        Ok(())
    }

    async fn bulk_delete(&self, keys: &[RecordKey]) -> AdapterResult<()> {
        let mut rows = self.rows.write().await;
        // Unknown keys are silently ignored
        rows.retain(|row| {
            let value = row.get_key(&self.key_field);
            !keys.iter().any(|key| key.matches(value))
        });
        Ok(())
    }
}

trait RecordKeyed {
    fn get_key<'a>(&'a self, key_field: &str) -> &'a Value;
}

impl RecordKeyed for Record {
    fn get_key<'a>(&'a self, key_field: &str) -> &'a Value {
        self.get(key_field).unwrap_or(&Value::Null)
    }
}
