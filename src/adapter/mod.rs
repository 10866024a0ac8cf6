//! Adapter layer
//!
//! One contract ([`DataAdapter`]) bound to four backends. The local
//! adapter defines the reference semantics; the remote adapters translate
//! the same query model into their backend's native request mechanics and
//! normalize failures into the shared taxonomy.

mod cancel;
mod graphql;
mod local;
mod rest;
mod supabase;
mod traits;

pub use cancel::CancellationToken;
pub use graphql::{GraphQLAdapter, GraphQLDocuments, VariablesTransform};
pub use local::{FilterFn, LocalAdapter, SortFn};
pub use rest::{
    QueryParamNames, QueryTransform, ResponseTransform, RestAdapter, RestConvention,
    RestEndpoints,
};
pub use supabase::{
    ChangeCallback, ChangeChannel, ChannelHandle, CountMode, Relation, SupabaseAdapter,
    SupabaseClient, TableRequest, TableResponse,
};
pub use traits::{ChangeListener, DataAdapter, Operation, Subscription};
