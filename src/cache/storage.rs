//! Cache storage backends: in-memory, SQLite, and disabled.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};

use super::traits::{CacheStore, StoredEntry};

/// In-memory backend. Contents die with the process.
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, StoredEntry>>> {
    self
      .entries
      .lock()
      .map_err(|_| Error::Storage("cache lock poisoned".into()))
  }
}

impl CacheStore for MemoryStore {
  fn read(&self, key: &str) -> Result<Option<StoredEntry>> {
    Ok(self.lock()?.get(key).cloned())
  }

  fn write(&self, key: &str, entry: &StoredEntry) -> Result<()> {
    self.lock()?.insert(key.to_string(), entry.clone());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    self.lock()?.remove(key);
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    self.lock()?.clear();
    Ok(())
  }
}

/// Backend that doesn't cache anything. Used when caching is disabled -
/// all operations are no-ops.
pub struct NoopStore;

impl CacheStore for NoopStore {
  fn read(&self, _key: &str) -> Result<Option<StoredEntry>> {
    Ok(None) // Always miss
  }

  fn write(&self, _key: &str, _entry: &StoredEntry) -> Result<()> {
    Ok(()) // Discard
  }

  fn remove(&self, _key: &str) -> Result<()> {
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    Ok(())
  }
}

/// SQLite-backed store so cached query payloads survive restarts.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the cache database at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&default_data_path("cache.db")?)
  }

  /// Open or create the cache database at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| Error::Storage(format!("failed to create cache directory: {}", e)))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| Error::Storage(format!("failed to open cache database at {}: {}", path.display(), e)))?;

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  fn run_migrations(&self) -> Result<()> {
    self.lock()?.execute_batch(CACHE_SCHEMA)?;
    Ok(())
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|_| Error::Storage("cache database lock poisoned".into()))
  }
}

/// Schema for the cache table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS query_cache (
    cache_key TEXT PRIMARY KEY,
    payload BLOB NOT NULL,
    fetched_at TEXT NOT NULL,
    stale_after_ms INTEGER NOT NULL
);
"#;

impl CacheStore for SqliteStore {
  fn read(&self, key: &str) -> Result<Option<StoredEntry>> {
    let conn = self.lock()?;

    let row: Option<(Vec<u8>, String, i64)> = conn
      .query_row(
        "SELECT payload, fetched_at, stale_after_ms FROM query_cache WHERE cache_key = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
      )
      .optional()?;

    match row {
      Some((payload, fetched_at, stale_after_ms)) => Ok(Some(StoredEntry {
        payload,
        fetched_at: parse_datetime(&fetched_at)?,
        stale_after: Duration::milliseconds(stale_after_ms),
      })),
      None => Ok(None),
    }
  }

  fn write(&self, key: &str, entry: &StoredEntry) -> Result<()> {
    let conn = self.lock()?;

    conn.execute(
      "INSERT OR REPLACE INTO query_cache (cache_key, payload, fetched_at, stale_after_ms)
       VALUES (?, ?, ?, ?)",
      params![
        key,
        entry.payload,
        entry.fetched_at.to_rfc3339(),
        entry.stale_after.num_milliseconds()
      ],
    )?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    self
      .lock()?
      .execute("DELETE FROM query_cache WHERE cache_key = ?", params![key])?;
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    self.lock()?.execute("DELETE FROM query_cache", [])?;
    Ok(())
  }
}

/// Default location for an on-disk store file.
pub(crate) fn default_data_path(file: &str) -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| Error::Storage("could not determine data directory".into()))?;

  Ok(data_dir.join("cuide-se").join(file))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Storage(format!("failed to parse timestamp '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(payload: &str, stale_after: Duration) -> StoredEntry {
    StoredEntry {
      payload: payload.as_bytes().to_vec(),
      fetched_at: Utc::now(),
      stale_after,
    }
  }

  #[test]
  fn test_memory_store_roundtrip() {
    let store = MemoryStore::new();
    store.write("k", &entry("\"v\"", Duration::minutes(5))).unwrap();

    let read = store.read("k").unwrap().unwrap();
    assert_eq!(read.payload, b"\"v\"");

    store.remove("k").unwrap();
    assert!(store.read("k").unwrap().is_none());
  }

  #[test]
  fn test_memory_store_clear() {
    let store = MemoryStore::new();
    store.write("a", &entry("1", Duration::minutes(5))).unwrap();
    store.write("b", &entry("2", Duration::minutes(5))).unwrap();

    store.clear().unwrap();
    assert!(store.read("a").unwrap().is_none());
    assert!(store.read("b").unwrap().is_none());
  }

  #[test]
  fn test_sqlite_store_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open_at(&dir.path().join("cache.db")).unwrap();

    let written = entry("{\"id\":1}", Duration::seconds(30));
    store.write("k", &written).unwrap();

    let read = store.read("k").unwrap().unwrap();
    assert_eq!(read.payload, written.payload);
    assert_eq!(read.stale_after, written.stale_after);
    // RFC 3339 keeps sub-second precision, so the timestamp survives intact
    assert_eq!(read.fetched_at, written.fetched_at);
  }

  #[test]
  fn test_sqlite_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    {
      let store = SqliteStore::open_at(&path).unwrap();
      store.write("k", &entry("\"v\"", Duration::minutes(5))).unwrap();
    }

    let store = SqliteStore::open_at(&path).unwrap();
    assert!(store.read("k").unwrap().is_some());
  }

  #[test]
  fn test_noop_store_always_misses() {
    let store = NoopStore;
    store.write("k", &entry("\"v\"", Duration::minutes(5))).unwrap();
    assert!(store.read("k").unwrap().is_none());
  }
}
