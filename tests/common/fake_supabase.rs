//! In-memory fake of the fluent Supabase protocol
//!
//! Records every builder call so tests can assert the adapter's
//! translation, answers selects with canned rows and count, and lets the
//! test fire realtime change events by hand.

// Each test binary uses a different slice of the fake
#![allow(dead_code)]

use async_trait::async_trait;
use rowset::adapter::{
    ChangeCallback, ChangeChannel, ChannelHandle, CountMode, SupabaseClient, TableRequest,
    TableResponse,
};
use rowset::Record;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Shared {
    rows: Mutex<Vec<Record>>,
    count: Mutex<Option<u64>>,
    fail_with: Mutex<Option<Value>>,
    calls: Mutex<Vec<String>>,
    listener: Mutex<Option<Arc<dyn Fn(Value) + Send + Sync>>>,
    unsubscribe_error: Mutex<Option<Value>>,
    unsubscribed: AtomicBool,
}

impl Shared {
    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

/// The fake client; keep a handle in the test, hand a clone (as
/// `Arc<dyn SupabaseClient>`) to the adapter.
#[derive(Clone, Default)]
pub struct FakeSupabase {
    shared: Arc<Shared>,
}

impl FakeSupabase {
    pub fn new(rows: Vec<Record>) -> Self {
        let count = rows.len() as u64;
        let fake = Self::default();
        *fake.shared.rows.lock().unwrap() = rows;
        *fake.shared.count.lock().unwrap() = Some(count);
        fake
    }

    /// Override the exact count reported alongside selects.
    pub fn with_total(self, total: u64) -> Self {
        *self.shared.count.lock().unwrap() = Some(total);
        self
    }

    /// Make the next execute fail with a native error object.
    pub fn fail_next(&self, error: Value) {
        *self.shared.fail_with.lock().unwrap() = Some(error);
    }

    /// Make channel unsubscription fail with a native error object.
    pub fn fail_unsubscribe(&self, error: Value) {
        *self.shared.unsubscribe_error.lock().unwrap() = Some(error);
    }

    /// The builder calls seen so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.shared.calls.lock().unwrap().clone()
    }

    /// Fire a realtime change event at the registered listener.
    pub fn emit(&self, event: Value) {
        let listener = self.shared.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener(event);
        }
    }

    pub fn has_listener(&self) -> bool {
        self.shared.listener.lock().unwrap().is_some()
    }

    pub fn was_unsubscribed(&self) -> bool {
        self.shared.unsubscribed.load(Ordering::SeqCst)
    }
}

impl SupabaseClient for FakeSupabase {
    fn from(&self, table: &str) -> Box<dyn TableRequest> {
        self.shared.log(format!("from({table})"));
        Box::new(FakeRequest {
            shared: Arc::clone(&self.shared),
            count_mode: CountMode::None,
        })
    }

    fn channel(&self, name: &str) -> Box<dyn ChangeChannel> {
        self.shared.log(format!("channel({name})"));
        Box::new(FakeChannel {
            shared: Arc::clone(&self.shared),
        })
    }
}

struct FakeRequest {
    shared: Arc<Shared>,
    count_mode: CountMode,
}

impl FakeRequest {
    fn logged(self: Box<Self>, call: String) -> Box<dyn TableRequest> {
        self.shared.log(call);
        self
    }
}

#[async_trait]
impl TableRequest for FakeRequest {
    fn select(mut self: Box<Self>, columns: &str, count: CountMode) -> Box<dyn TableRequest> {
        self.count_mode = count;
        let tag = match count {
            CountMode::Exact => "exact",
            CountMode::None => "none",
        };
        self.logged(format!("select({columns};count={tag})"))
    }

    fn insert(self: Box<Self>, row: Value) -> Box<dyn TableRequest> {
        self.logged(format!("insert({row})"))
    }

    fn update(self: Box<Self>, patch: Value) -> Box<dyn TableRequest> {
        self.logged(format!("update({patch})"))
    }

    fn delete(self: Box<Self>) -> Box<dyn TableRequest> {
        self.logged("delete()".to_string())
    }

    fn eq(self: Box<Self>, column: &str, value: Value) -> Box<dyn TableRequest> {
        self.logged(format!("eq({column},{value})"))
    }

    fn in_list(self: Box<Self>, column: &str, values: Vec<Value>) -> Box<dyn TableRequest> {
        self.logged(format!("in({column},{})", Value::Array(values)))
    }

    fn gte(self: Box<Self>, column: &str, value: Value) -> Box<dyn TableRequest> {
        self.logged(format!("gte({column},{value})"))
    }

    fn lte(self: Box<Self>, column: &str, value: Value) -> Box<dyn TableRequest> {
        self.logged(format!("lte({column},{value})"))
    }

    fn ilike(self: Box<Self>, column: &str, pattern: &str) -> Box<dyn TableRequest> {
        self.logged(format!("ilike({column},{pattern})"))
    }

    fn order(self: Box<Self>, column: &str, ascending: bool) -> Box<dyn TableRequest> {
        let dir = if ascending { "asc" } else { "desc" };
        self.logged(format!("order({column},{dir})"))
    }

    fn range(self: Box<Self>, from: u64, to: u64) -> Box<dyn TableRequest> {
        self.logged(format!("range({from},{to})"))
    }

    fn limit(self: Box<Self>, count: u64) -> Box<dyn TableRequest> {
        self.logged(format!("limit({count})"))
    }

    async fn execute(self: Box<Self>) -> Result<TableResponse, Value> {
        self.shared.log("execute()".to_string());
        if let Some(error) = self.shared.fail_with.lock().unwrap().take() {
            return Err(error);
        }
        let rows = self.shared.rows.lock().unwrap().clone();
        let count = match self.count_mode {
            CountMode::Exact => *self.shared.count.lock().unwrap(),
            CountMode::None => None,
        };
        Ok(TableResponse { rows, count })
    }
}

struct FakeChannel {
    shared: Arc<Shared>,
}

impl ChangeChannel for FakeChannel {
    fn on_change(
        self: Box<Self>,
        event: &str,
        table: &str,
        callback: ChangeCallback,
    ) -> Box<dyn ChangeChannel> {
        self.shared.log(format!("on_change({event},{table})"));
        *self.shared.listener.lock().unwrap() = Some(Arc::from(callback));
        self
    }

    fn subscribe(self: Box<Self>) -> Box<dyn ChannelHandle> {
        self.shared.log("subscribe()".to_string());
        Box::new(FakeHandle {
            shared: Arc::clone(&self.shared),
        })
    }
}

struct FakeHandle {
    shared: Arc<Shared>,
}

impl ChannelHandle for FakeHandle {
    fn unsubscribe(&self) -> Result<(), Value> {
        self.shared.unsubscribed.store(true, Ordering::SeqCst);
        self.shared.log("unsubscribe()".to_string());
        match self.shared.unsubscribe_error.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
