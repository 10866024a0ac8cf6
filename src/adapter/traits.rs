//! The adapter contract
//!
//! An adapter binds the shared query model to one concrete backend. Only
//! `fetch` is mandatory; everything else is a capability the adapter
//! declares through [`DataAdapter::supports`], so consumers can degrade
//! gracefully instead of forcing every backend to fake every method.

use crate::error::{AdapterError, AdapterResult};
use crate::query::{DataQuery, DataResponse, Record, RecordKey};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Operations beyond `fetch` that a backend may or may not offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
    BulkDelete,
    Subscribe,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::BulkDelete => "bulk_delete",
            Self::Subscribe => "subscribe",
        };
        f.write_str(name)
    }
}

/// Callback invoked with a fresh page whenever a realtime backend reports
/// a change.
pub type ChangeListener = Arc<dyn Fn(DataResponse) + Send + Sync>;

/// Teardown guard for an active realtime subscription.
///
/// Dropping the guard tears the channel down as well; teardown failures
/// are logged by the adapter, never surfaced.
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A subscription with nothing behind it, for adapters (or
    /// configurations) without realtime.
    pub fn noop() -> Self {
        Self { teardown: None }
    }

    pub fn is_active(&self) -> bool {
        self.teardown.is_some()
    }

    /// Tear down the channel.
    pub fn unsubscribe(mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// The uniform contract over heterogeneous backends.
///
/// Implementations translate the query model into their native request,
/// normalize results into [`DataResponse`], and classify every failure
/// into the [`AdapterError`] taxonomy. Queries are borrowed immutably and
/// never modified.
///
/// `create`/`update` return `None` when the backend acknowledged the write
/// without echoing the record (e.g. a 204 response).
#[async_trait]
pub trait DataAdapter: Send + Sync {
    /// Execute a query and return the normalized page.
    async fn fetch(&self, query: &DataQuery) -> AdapterResult<DataResponse>;

    /// Whether this adapter implements `operation`.
    fn supports(&self, operation: Operation) -> bool {
        let _ = operation;
        false
    }

    async fn create(&self, item: Record) -> AdapterResult<Option<Record>> {
        let _ = item;
        Err(AdapterError::unsupported("create"))
    }

    async fn update(&self, key: &RecordKey, patch: Record) -> AdapterResult<Option<Record>> {
        let _ = (key, patch);
        Err(AdapterError::unsupported("update"))
    }

    async fn delete(&self, key: &RecordKey) -> AdapterResult<()> {
        let _ = key;
        Err(AdapterError::unsupported("delete"))
    }

    async fn bulk_delete(&self, keys: &[RecordKey]) -> AdapterResult<()> {
        let _ = keys;
        Err(AdapterError::unsupported("bulk_delete"))
    }

    /// Open a realtime push channel, delivering fresh pages to `listener`.
    ///
    /// Adapters without realtime return a no-op guard; callers gate on
    /// `supports(Operation::Subscribe)` to know the difference.
    async fn subscribe(&self, listener: ChangeListener) -> AdapterResult<Subscription> {
        let _ = listener;
        Ok(Subscription::noop())
    }
}
