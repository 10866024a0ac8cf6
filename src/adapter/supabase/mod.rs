//! SupabaseAdapter — the query model on a fluent server-side builder
//!
//! Filter decisions mirror the local adapter's rules but each one is
//! delegated to a backend operator (list → IN, range → gte/lte, scalar →
//! eq). The page and an exact row count come back in one round trip.
//! Realtime, when enabled, refetches the adapter's current query on every
//! change event rather than patching incrementally: the contract is
//! eventual full-page consistency, not minimal update cost.

mod protocol;

pub use protocol::{
    ChangeCallback, ChangeChannel, ChannelHandle, CountMode, SupabaseClient, TableRequest,
    TableResponse,
};

use crate::adapter::traits::{ChangeListener, DataAdapter, Operation, Subscription};
use crate::error::{AdapterError, AdapterResult};
use crate::query::{DataQuery, DataResponse, FilterValue, Record, RecordKey, ScalarValue};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

const DEFAULT_PAGE_SIZE: u32 = 10;
const KEY_COLUMN: &str = "id";

/// A related table embedded into each result row via a nested select.
#[derive(Debug, Clone)]
pub struct Relation {
    pub table: String,
    pub foreign_key: String,
    pub columns: Vec<String>,
}

/// Adapter over a caller-supplied fluent client.
pub struct SupabaseAdapter {
    inner: Arc<Inner>,
}

struct Inner {
    client: Arc<dyn SupabaseClient>,
    table: String,
    select_columns: Vec<String>,
    relations: Vec<Relation>,
    search_column: Option<String>,
    realtime: bool,
    realtime_channel: Option<String>,
    // The query the realtime listener replays on every change event
    last_query: Mutex<DataQuery>,
}

impl SupabaseAdapter {
    pub fn new(client: Arc<dyn SupabaseClient>, table: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                table: table.into(),
                select_columns: vec!["*".to_string()],
                relations: Vec::new(),
                search_column: None,
                realtime: false,
                realtime_channel: None,
                last_query: Mutex::new(DataQuery::new()),
            }),
        }
    }

    fn inner_mut(&mut self) -> &mut Inner {
        Arc::get_mut(&mut self.inner).expect("configure before sharing")
    }

    pub fn with_select_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner_mut().select_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.inner_mut().relations.push(relation);
        self
    }

    /// Column free-text search applies `ilike %needle%` to. The fluent
    /// protocol composes filters with AND only, so the local adapter's
    /// any-field rule is approximated by a single column; without one,
    /// search is skipped.
    pub fn with_search_column(mut self, column: impl Into<String>) -> Self {
        self.inner_mut().search_column = Some(column.into());
        self
    }

    pub fn with_realtime(mut self) -> Self {
        self.inner_mut().realtime = true;
        self
    }

    pub fn with_realtime_channel(mut self, name: impl Into<String>) -> Self {
        let inner = self.inner_mut();
        inner.realtime = true;
        inner.realtime_channel = Some(name.into());
        self
    }
}

impl Inner {
    fn select_clause(&self) -> String {
        let mut parts = vec![self.select_columns.join(",")];
        for relation in &self.relations {
            let columns = if relation.columns.is_empty() {
                "*".to_string()
            } else {
                relation.columns.join(",")
            };
            if relation.foreign_key.is_empty() {
                parts.push(format!("{}({columns})", relation.table));
            } else {
                parts.push(format!("{}!{}({columns})", relation.table, relation.foreign_key));
            }
        }
        parts.join(",")
    }

    fn apply_filters(
        &self,
        mut request: Box<dyn TableRequest>,
        query: &DataQuery,
    ) -> Box<dyn TableRequest> {
        for (field, filter) in &query.filters {
            request = match filter {
                FilterValue::Scalar(scalar) => request.eq(field, scalar.to_value()),
                FilterValue::List(items) => {
                    let values = items.iter().map(ScalarValue::to_value).collect();
                    request.in_list(field, values)
                }
                FilterValue::NumberRange(range) => {
                    if let Some(min) = range.min {
                        request = request.gte(field, Value::from(min));
                    }
                    if let Some(max) = range.max {
                        request = request.lte(field, Value::from(max));
                    }
                    request
                }
                FilterValue::DateRange(range) => {
                    if let Some(start) = range.start {
                        request = request.gte(field, Value::String(start.to_rfc3339()));
                    }
                    if let Some(end) = range.end {
                        request = request.lte(field, Value::String(end.to_rfc3339()));
                    }
                    request
                }
            };
        }

        if let Some(needle) = query.search_needle() {
            match &self.search_column {
                Some(column) => request = request.ilike(column, &format!("%{needle}%")),
                None => tracing::debug!("search ignored: no search column configured"),
            }
        }
        request
    }

    async fn run_query(&self, query: &DataQuery) -> AdapterResult<DataResponse> {
        let mut request = self
            .client
            .from(&self.table)
            .select(&self.select_clause(), CountMode::Exact);

        request = self.apply_filters(request, query);

        for entry in &query.sort {
            request = request.order(&entry.column, entry.direction.is_ascending());
        }

        let page = query.page.unwrap_or(1).max(1);
        let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        let (from, to) = row_window(page, page_size);
        request = request.range(from, to);

        let response = request.execute().await.map_err(backend_error)?;
        let total = response.count.unwrap_or(response.rows.len() as u64);

        tracing::debug!(table = %self.table, total, page, "supabase fetch");

        Ok(DataResponse {
            data: response.rows,
            total,
            page,
            page_size,
            metadata: None,
        })
    }
}

#[async_trait]
impl DataAdapter for SupabaseAdapter {
    async fn fetch(&self, query: &DataQuery) -> AdapterResult<DataResponse> {
        let response = self.inner.run_query(query).await?;
        *self.inner.last_query.lock().await = query.clone();
        Ok(response)
    }

    fn supports(&self, operation: Operation) -> bool {
        match operation {
            Operation::Subscribe => self.inner.realtime,
            _ => true,
        }
    }

    async fn create(&self, item: Record) -> AdapterResult<Option<Record>> {
        let response = self
            .inner
            .client
            .from(&self.inner.table)
            .insert(Value::Object(item))
            .select(&self.inner.select_clause(), CountMode::None)
            .execute()
            .await
            .map_err(backend_error)?;
        Ok(response.rows.into_iter().next())
    }

    async fn update(&self, key: &RecordKey, patch: Record) -> AdapterResult<Option<Record>> {
        let response = self
            .inner
            .client
            .from(&self.inner.table)
            .update(Value::Object(patch))
            .eq(KEY_COLUMN, key.to_value())
            .select(&self.inner.select_clause(), CountMode::None)
            .execute()
            .await
            .map_err(backend_error)?;
        Ok(response.rows.into_iter().next())
    }

    async fn delete(&self, key: &RecordKey) -> AdapterResult<()> {
        self.inner
            .client
            .from(&self.inner.table)
            .delete()
            .eq(KEY_COLUMN, key.to_value())
            .execute()
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn bulk_delete(&self, keys: &[RecordKey]) -> AdapterResult<()> {
        let values: Vec<Value> = keys.iter().map(RecordKey::to_value).collect();
        self.inner
            .client
            .from(&self.inner.table)
            .delete()
            .in_list(KEY_COLUMN, values)
            .execute()
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn subscribe(&self, listener: ChangeListener) -> AdapterResult<Subscription> {
        if !self.inner.realtime {
            return Ok(Subscription::noop());
        }

        let channel_name = self
            .inner
            .realtime_channel
            .clone()
            .unwrap_or_else(|| format!("{}-changes", self.inner.table));

        let inner = Arc::clone(&self.inner);
        let callback: ChangeCallback = Box::new(move |_event| {
            let inner = Arc::clone(&inner);
            let listener = Arc::clone(&listener);
            // Refetch the whole current page; the event payload is ignored.
            tokio::spawn(async move {
                let query = inner.last_query.lock().await.clone();
                match inner.run_query(&query).await {
                    Ok(response) => listener(response),
                    Err(err) => tracing::warn!(error = %err, "realtime refetch failed"),
                }
            });
        });

        let handle = self
            .inner
            .client
            .channel(&channel_name)
            .on_change("*", &self.inner.table, callback)
            .subscribe();

        Ok(Subscription::new(move || {
            if let Err(err) = handle.unsubscribe() {
                tracing::warn!(error = %err, "channel unsubscribe failed");
            }
        }))
    }
}

/// Inclusive `[from, to]` window for a 1-indexed page.
fn row_window(page: u32, page_size: u32) -> (u64, u64) {
    let from = u64::from(page - 1) * u64::from(page_size);
    let to = from + u64::from(page_size).saturating_sub(1);
    (from, to)
}

fn backend_error(native: Value) -> AdapterError {
    let message = native
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("backend error: {native}"));
    AdapterError::network_with(message, native)
}
