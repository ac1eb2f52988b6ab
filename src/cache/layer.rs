//! Cache layer that orchestrates freshness checks, fetching, and invalidation.

use chrono::{Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::{Error, Result};

use super::storage::MemoryStore;
use super::traits::{CacheStore, QueryKey, StoredEntry};

/// Fencing state for one key, kept only while fetches are in flight.
/// Writes and invalidations bump the generation; a fetch may commit its
/// result only while the generation it started under is still current.
#[derive(Default)]
struct KeyFence {
  generation: u64,
  in_flight: u32,
}

/// Keyed cache sitting between the application and the network client.
///
/// The cache is an explicitly constructed object: hosts create one at
/// startup and hand clones to whatever needs it. Clones share the same
/// backend and fencing state.
pub struct QueryCache<S: CacheStore> {
  store: Arc<S>,
  /// How long before cached data is considered stale.
  default_stale_after: Duration,
  /// Whether `release` evicts the entry for the released key.
  evict_on_release: bool,
  /// One fence per key with a fetch in flight. Entries are dropped when
  /// the last fetch for the key completes.
  fences: Arc<Mutex<HashMap<String, KeyFence>>>,
}

impl QueryCache<MemoryStore> {
  /// Create a cache over a fresh in-memory store.
  pub fn in_memory() -> Self {
    Self::new(MemoryStore::new())
  }
}

impl<S: CacheStore> QueryCache<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(store: S) -> Self {
    Self {
      store: Arc::new(store),
      default_stale_after: Duration::minutes(5),
      evict_on_release: true,
      fences: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Set the default staleness window for cached data.
  pub fn with_stale_time(mut self, stale_after: Duration) -> Self {
    self.default_stale_after = stale_after;
    self
  }

  /// Set whether `release` evicts the released key's entry.
  pub fn with_evict_on_release(mut self, evict: bool) -> Self {
    self.evict_on_release = evict;
    self
  }

  /// Non-blocking read. Absent and no-longer-fresh entries both read as
  /// `None`. The stored row itself is not removed.
  pub fn get<T, K>(&self, key: &K) -> Result<Option<T>>
  where
    T: DeserializeOwned,
    K: QueryKey + ?Sized,
  {
    match self.store.read(&key.cache_hash())? {
      Some(entry) if entry.is_fresh(Utc::now()) => Ok(Some(entry.decode()?)),
      _ => Ok(None),
    }
  }

  /// Fetch with cache-first strategy using the default staleness window.
  ///
  /// 1. Check cache - if fresh, return immediately without calling `fetcher`
  /// 2. If stale/missing, await `fetcher`
  /// 3. On success, store the result under `key` with a new timestamp
  /// 4. On failure, propagate the error; the cache keeps its prior state
  pub async fn fetch<T, K, F, Fut>(&self, key: &K, fetcher: F) -> Result<T>
  where
    T: Serialize + DeserializeOwned,
    K: QueryKey + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    self.fetch_with_ttl(key, self.default_stale_after, fetcher).await
  }

  /// Fetch with an explicit staleness window for the written entry.
  pub async fn fetch_with_ttl<T, K, F, Fut>(
    &self,
    key: &K,
    stale_after: Duration,
    fetcher: F,
  ) -> Result<T>
  where
    T: Serialize + DeserializeOwned,
    K: QueryKey + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let hash = key.cache_hash();

    if let Some(entry) = self.store.read(&hash)? {
      if entry.is_fresh(Utc::now()) {
        debug!(key = %key.description(), "cache hit");
        return entry.decode();
      }
    }

    let generation = self.begin_fetch(&hash)?;
    debug!(key = %key.description(), "cache miss, fetching");
    let value = match fetcher().await {
      Ok(value) => value,
      Err(e) => {
        self.end_fetch(&hash, generation)?;
        return Err(e);
      }
    };

    // First writer wins: a fetch that raced with an invalidation or with a
    // faster fetch for the same key returns its data without committing it.
    if self.end_fetch(&hash, generation)? {
      let entry = StoredEntry::new(&value, stale_after)?;
      self.store.write(&hash, &entry)?;
      self.bump_fence(&hash)?;
    } else {
      debug!(key = %key.description(), "fetch superseded, result not cached");
    }

    Ok(value)
  }

  /// Write a value directly using the default staleness window.
  pub fn put<T, K>(&self, key: &K, value: &T) -> Result<()>
  where
    T: Serialize,
    K: QueryKey + ?Sized,
  {
    self.put_with_ttl(key, value, self.default_stale_after)
  }

  /// Write a value directly with an explicit staleness window.
  pub fn put_with_ttl<T, K>(&self, key: &K, value: &T, stale_after: Duration) -> Result<()>
  where
    T: Serialize,
    K: QueryKey + ?Sized,
  {
    let hash = key.cache_hash();
    let entry = StoredEntry::new(value, stale_after)?;
    self.store.write(&hash, &entry)?;
    self.bump_fence(&hash)
  }

  /// Remove the entry for `key`. The next `get` or `fetch` treats the key
  /// as absent. Idempotent.
  pub fn invalidate<K>(&self, key: &K) -> Result<()>
  where
    K: QueryKey + ?Sized,
  {
    debug!(key = %key.description(), "invalidating");
    self.store.remove(&key.cache_hash())?;
    self.bump_fence(&key.cache_hash())
  }

  /// Remove every entry.
  pub fn clear(&self) -> Result<()> {
    self.store.clear()?;
    let mut fences = self.lock_fences()?;
    for fence in fences.values_mut() {
      fence.generation += 1;
    }
    Ok(())
  }

  /// Cleanup hook for a view releasing its interest in a key. Evicts the
  /// entry only when the cache was configured with `evict_on_release`.
  pub fn release<K>(&self, key: &K) -> Result<()>
  where
    K: QueryKey + ?Sized,
  {
    if self.evict_on_release {
      self.invalidate(key)
    } else {
      Ok(())
    }
  }

  /// Register an in-flight fetch and return the generation it starts under.
  fn begin_fetch(&self, hash: &str) -> Result<u64> {
    let mut fences = self.lock_fences()?;
    let fence = fences.entry(hash.to_string()).or_default();
    fence.in_flight += 1;
    Ok(fence.generation)
  }

  /// Deregister an in-flight fetch, returning whether its start generation
  /// is still current. The fence is dropped once no fetch remains, so the
  /// map never outgrows the number of concurrent fetches.
  fn end_fetch(&self, hash: &str, started_at: u64) -> Result<bool> {
    let mut fences = self.lock_fences()?;
    let Some(fence) = fences.get_mut(hash) else {
      return Ok(false);
    };
    fence.in_flight = fence.in_flight.saturating_sub(1);
    let current = fence.generation == started_at;
    if fence.in_flight == 0 {
      fences.remove(hash);
    }
    Ok(current)
  }

  /// Supersede in-flight fetches for a key. No-op when none are tracked.
  fn bump_fence(&self, hash: &str) -> Result<()> {
    let mut fences = self.lock_fences()?;
    if let Some(fence) = fences.get_mut(hash) {
      fence.generation += 1;
    }
    Ok(())
  }

  fn lock_fences(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, KeyFence>>> {
    self
      .fences
      .lock()
      .map_err(|_| Error::Storage("fence map lock poisoned".into()))
  }
}

impl<S: CacheStore> Clone for QueryCache<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      default_stale_after: self.default_stale_after,
      evict_on_release: self.evict_on_release,
      fences: Arc::clone(&self.fences),
    }
  }
}
