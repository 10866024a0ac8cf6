//! Rowset: Backend-Agnostic Data Source Adapters
//!
//! A uniform contract for fetching, creating, updating, and deleting
//! tabular records against heterogeneous backends, plus a stateful
//! consumer that drives loading, querying, mutation, and cancellation
//! semantics on top of any adapter.
//!
//! # Core Concepts
//!
//! - **DataQuery**: backend-agnostic description of what page/sort/filter/
//!   search to fetch
//! - **DataAdapter**: the capability trait each backend implements
//!   (in-memory, REST, GraphQL, Supabase-style builder)
//! - **DataController**: holds a query and a state snapshot, supersedes
//!   stale requests, and resynchronizes after mutations
//!
//! # Example
//!
//! ```
//! use rowset::{DataQuery, FilterValue, LocalAdapter, SortEntry};
//!
//! let adapter = LocalAdapter::new(Vec::new());
//! let query = DataQuery::new()
//!     .with_page(1)
//!     .with_page_size(20)
//!     .with_filter("qty", FilterValue::number_range(1.0, None))
//!     .with_sort(SortEntry::asc("name"));
//! # let _ = (adapter, query);
//! ```

pub mod adapter;
pub mod consumer;
mod error;
pub mod query;

pub use adapter::{
    CancellationToken, ChangeListener, DataAdapter, GraphQLAdapter, GraphQLDocuments,
    LocalAdapter, Operation, QueryParamNames, Relation, RestAdapter, RestConvention,
    RestEndpoints, Subscription, SupabaseAdapter, SupabaseClient,
};
pub use consumer::{ControllerOptions, ControllerState, DataController, LoadPhase};
pub use error::{AdapterError, AdapterResult};
pub use query::{
    DataQuery, DataResponse, DateRange, FilterValue, NumberRange, QueryPatch, Record, RecordKey,
    ScalarValue, SortDirection, SortEntry,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
