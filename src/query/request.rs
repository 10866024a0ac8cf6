//! The backend-agnostic request descriptor

use super::types::{FilterValue, SortEntry};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Describes what page/sort/filter/search to fetch.
///
/// A query is held by the consumer and passed by shared reference to
/// adapters, which translate it into their backend's native request and
/// never mutate it. Absent `page`/`page_size` mean "no pagination" for the
/// local adapter; remote adapters apply their own defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DataQuery {
    /// 1-indexed page number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "pageSize")]
    pub page_size: Option<u32>,
    /// Primary sort key first; later entries break ties
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortEntry>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, FilterValue>,
    /// Free-text needle matched against the adapter's search fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Backend-specific escape hatch, appended to the request as-is
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Value>,
}

impl DataQuery {
    /// An unconstrained query (everything, unspecified order).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Append a sort key (first call sets the primary key).
    pub fn with_sort(mut self, entry: SortEntry) -> Self {
        self.sort.push(entry);
        self
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// The search needle, if non-empty.
    pub fn search_needle(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}

/// A partial query overlay.
///
/// `refetch` merges a patch into the held query with spread semantics:
/// every field present in the patch replaces the held field wholesale,
/// absent fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct QueryPatch {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<Vec<SortEntry>>,
    pub filters: Option<BTreeMap<String, FilterValue>>,
    pub search: Option<String>,
    pub params: Option<BTreeMap<String, Value>>,
}

impl QueryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn sort(mut self, sort: Vec<SortEntry>) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn filters(mut self, filters: BTreeMap<String, FilterValue>) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters
            .get_or_insert_with(BTreeMap::new)
            .insert(field.into(), value.into());
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn params(mut self, params: BTreeMap<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    /// Merge into `query`, replacing the fields this patch carries.
    pub fn apply(self, query: &mut DataQuery) {
        if let Some(page) = self.page {
            query.page = Some(page);
        }
        if let Some(page_size) = self.page_size {
            query.page_size = Some(page_size);
        }
        if let Some(sort) = self.sort {
            query.sort = sort;
        }
        if let Some(filters) = self.filters {
            query.filters = filters;
        }
        if let Some(search) = self.search {
            query.search = Some(search);
        }
        if let Some(params) = self.params {
            query.params = params;
        }
    }
}
