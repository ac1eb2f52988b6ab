//! Mutation plans: a single write plus the cached reads it outdates.

use std::future::Future;
use tracing::info;

use crate::error::Result;

use super::layer::QueryCache;
use super::traits::{CacheStore, QueryKey};

/// The kind of write a mutation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Create,
  Update,
  Delete,
}

/// A declared mutation: the operation kind plus the query keys whose cached
/// results become outdated once it succeeds.
#[derive(Debug, Clone)]
pub struct Mutation<K: QueryKey> {
  pub operation: Operation,
  pub invalidates: Vec<K>,
}

impl<K: QueryKey> Mutation<K> {
  pub fn new(operation: Operation) -> Self {
    Self {
      operation,
      invalidates: Vec::new(),
    }
  }

  /// Declare one key to invalidate on success.
  pub fn invalidates(mut self, key: K) -> Self {
    self.invalidates.push(key);
    self
  }

  /// Declare several keys to invalidate on success.
  pub fn invalidates_all(mut self, keys: impl IntoIterator<Item = K>) -> Self {
    self.invalidates.extend(keys);
    self
  }
}

impl<S: CacheStore> QueryCache<S> {
  /// Run `op` exactly once, with no retry. On success, invalidate every
  /// declared key so dependent reads refetch; invalidation order does not
  /// matter and repeated keys are harmless. On failure, propagate the
  /// error and leave the cache untouched.
  pub async fn mutate<T, K, F, Fut>(&self, mutation: Mutation<K>, op: F) -> Result<T>
  where
    K: QueryKey,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let result = op().await?;

    for key in &mutation.invalidates {
      self.invalidate(key)?;
    }
    info!(
      operation = ?mutation.operation,
      invalidated = mutation.invalidates.len(),
      "mutation committed"
    );

    Ok(result)
  }
}
