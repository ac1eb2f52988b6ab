//! Core traits and types for the caching system.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Trait for values identifying a cached result set.
///
/// Two logically equivalent keys must produce the same hash, which means
/// implementors are responsible for normalizing their parameters
/// (order-independent serialization, trimming, case folding).
pub trait QueryKey {
  /// Stable key under which the result set is stored.
  fn cache_hash(&self) -> String;

  /// Human-readable form, used for logging.
  fn description(&self) -> String;
}

// Plain strings act as keys directly. Used for host-defined entries where
// the caller already controls normalization.
impl QueryKey for str {
  fn cache_hash(&self) -> String {
    self.to_string()
  }

  fn description(&self) -> String {
    self.to_string()
  }
}

impl QueryKey for String {
  fn cache_hash(&self) -> String {
    self.clone()
  }

  fn description(&self) -> String {
    self.clone()
  }
}

/// A raw cache row: JSON payload plus freshness metadata.
#[derive(Debug, Clone)]
pub struct StoredEntry {
  /// JSON-serialized payload.
  pub payload: Vec<u8>,
  /// When the payload was fetched or written.
  pub fetched_at: DateTime<Utc>,
  /// Staleness window. The entry is fresh while `now - fetched_at` stays
  /// below this duration.
  pub stale_after: Duration,
}

impl StoredEntry {
  /// Serialize a value into an entry stamped with the current time.
  pub fn new<T: Serialize>(value: &T, stale_after: Duration) -> Result<Self> {
    Ok(Self {
      payload: serde_json::to_vec(value)?,
      fetched_at: Utc::now(),
      stale_after,
    })
  }

  /// Whether the entry is still within its staleness window. A zero window
  /// is never fresh.
  pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
    now - self.fetched_at < self.stale_after
  }

  /// Deserialize the payload. Entries that no longer match their
  /// serialization contract surface as a decode error rather than
  /// silently reading as absent.
  pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
    serde_json::from_slice(&self.payload).map_err(Into::into)
  }
}

/// Trait for cache storage backends. Backends hold raw entries; freshness
/// decisions belong to the layer above.
pub trait CacheStore: Send + Sync {
  /// Read the entry stored under `key`, fresh or not.
  fn read(&self, key: &str) -> Result<Option<StoredEntry>>;

  /// Write an entry, replacing any previous one under the same key.
  fn write(&self, key: &str, entry: &StoredEntry) -> Result<()>;

  /// Remove the entry under `key`. Removing an absent key is not an error.
  fn remove(&self, key: &str) -> Result<()>;

  /// Remove every entry.
  fn clear(&self) -> Result<()>;
}
