//! services/client/src/cache/mod.rs
//!
//! Client-side server state: keyed queries and the mutations that invalidate them.

pub mod key;
pub mod keys;
pub mod mutation;
pub mod query;

pub use key::QueryKey;
pub use mutation::{Mutation, MutationStatus};
pub use query::{QueryCache, QueryObserver, QueryOptions, QueryState, QueryStatus};
