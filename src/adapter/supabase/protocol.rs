//! The fluent query-builder protocol the Supabase adapter drives
//!
//! The real client is supplied by the caller; these object-safe traits
//! mirror the surface the adapter needs (`from(table)` with
//! select/filter/order/range and a realtime channel). Implementations wrap
//! the actual service SDK; tests wrap an in-memory fake.

use crate::query::Record;
use async_trait::async_trait;
use serde_json::Value;

/// Whether to request an exact row count alongside the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMode {
    None,
    Exact,
}

/// Rows plus the exact count when one was requested.
#[derive(Debug, Clone, Default)]
pub struct TableResponse {
    pub rows: Vec<Record>,
    pub count: Option<u64>,
}

/// One fluent request against a table. Builder calls consume and return
/// the boxed request; `execute` performs the single round trip.
///
/// Errors come back as the backend's native error object; the adapter
/// wraps them without interpreting.
#[async_trait]
pub trait TableRequest: Send {
    fn select(self: Box<Self>, columns: &str, count: CountMode) -> Box<dyn TableRequest>;
    fn insert(self: Box<Self>, row: Value) -> Box<dyn TableRequest>;
    fn update(self: Box<Self>, patch: Value) -> Box<dyn TableRequest>;
    fn delete(self: Box<Self>) -> Box<dyn TableRequest>;

    fn eq(self: Box<Self>, column: &str, value: Value) -> Box<dyn TableRequest>;
    fn in_list(self: Box<Self>, column: &str, values: Vec<Value>) -> Box<dyn TableRequest>;
    fn gte(self: Box<Self>, column: &str, value: Value) -> Box<dyn TableRequest>;
    fn lte(self: Box<Self>, column: &str, value: Value) -> Box<dyn TableRequest>;
    fn ilike(self: Box<Self>, column: &str, pattern: &str) -> Box<dyn TableRequest>;

    fn order(self: Box<Self>, column: &str, ascending: bool) -> Box<dyn TableRequest>;
    /// Inclusive row window `[from, to]`.
    fn range(self: Box<Self>, from: u64, to: u64) -> Box<dyn TableRequest>;
    fn limit(self: Box<Self>, count: u64) -> Box<dyn TableRequest>;

    async fn execute(self: Box<Self>) -> Result<TableResponse, Value>;
}

/// Raw change-event callback from the realtime channel.
pub type ChangeCallback = Box<dyn Fn(Value) + Send + Sync>;

/// A realtime channel being configured.
pub trait ChangeChannel: Send {
    /// Listen for postgres change events (`"*"` for all) on a table.
    fn on_change(
        self: Box<Self>,
        event: &str,
        table: &str,
        callback: ChangeCallback,
    ) -> Box<dyn ChangeChannel>;

    /// Activate the channel.
    fn subscribe(self: Box<Self>) -> Box<dyn ChannelHandle>;
}

/// An active channel; `unsubscribe` tears it down.
pub trait ChannelHandle: Send + Sync {
    fn unsubscribe(&self) -> Result<(), Value>;
}

/// The client surface: a table entry point and a channel factory.
pub trait SupabaseClient: Send + Sync {
    fn from(&self, table: &str) -> Box<dyn TableRequest>;
    fn channel(&self, name: &str) -> Box<dyn ChangeChannel>;
}
