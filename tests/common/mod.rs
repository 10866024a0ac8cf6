//! Common test utilities for the adapter integration suite
//!
//! Shared fixtures, a latency-controllable adapter for supersession
//! scenarios, and an in-memory fake of the fluent Supabase protocol.

pub mod fake_supabase;
pub mod slow_adapter;

use rowset::Record;
use serde_json::Value;

#[allow(unused_imports)]
pub use fake_supabase::FakeSupabase;
#[allow(unused_imports)]
pub use slow_adapter::SlowAdapter;

/// Install a fmt subscriber once so adapter traces show under
/// `--nocapture`.
#[allow(dead_code)]
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Unwrap a `json!` object literal into a [`Record`].
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// The warehouse fixture used across the suite.
#[allow(dead_code)]
pub fn parts() -> Vec<Record> {
    use serde_json::json;
    vec![
        record(json!({"id": 1, "name": "Bolt", "category": "fastener", "qty": 5})),
        record(json!({"id": 2, "name": "Nut", "category": "fastener", "qty": 0})),
        record(json!({"id": 3, "name": "Washer", "category": "fastener", "qty": 12})),
        record(json!({"id": 4, "name": "Gasket", "category": "seal", "qty": 7})),
    ]
}
