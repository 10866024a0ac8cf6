//! The query/response model every adapter speaks
//!
//! One vocabulary — pagination, multi-column sort, tagged filter shapes,
//! free-text search — translated by each adapter into its backend's native
//! request mechanics.

mod request;
mod response;
mod types;

pub use request::{DataQuery, QueryPatch};
pub use response::{DataResponse, Record, RecordKey};
pub use types::{DateRange, FilterValue, NumberRange, ScalarValue, SortDirection, SortEntry};

pub(crate) use types::parse_datetime;
