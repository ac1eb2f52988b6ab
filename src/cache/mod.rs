//! Keyed client-side cache for remote query results.
//!
//! This module provides the resource-agnostic caching mechanism the data
//! layer is built on:
//! - Entries carry a fetch timestamp and a staleness window
//! - Reads never block; stale or absent entries trigger a refetch
//! - Mutations invalidate their declared keys on success only
//! - Per-key fences supersede in-flight fetches that lost a race with an
//!   invalidation or a competing write; fencing state is kept only while
//!   a fetch is in flight

mod layer;
mod mutation;
mod storage;
mod traits;

pub(crate) use storage::default_data_path;

pub use layer::QueryCache;
pub use mutation::{Mutation, Operation};
pub use storage::{MemoryStore, NoopStore, SqliteStore};
pub use traits::{CacheStore, QueryKey, StoredEntry};
