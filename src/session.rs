//! Persisted session storage: bearer token, signed-in user, last activity.
//!
//! Values are JSON-serialized strings under a fixed application namespace,
//! so every backend is a plain string key-value store.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::api::types::User;
use crate::error::{Error, Result};

/// Namespace prefix applied to every persisted key.
const KEY_PREFIX: &str = "cuide_se";

const TOKEN_KEY: &str = "token";
const USER_KEY: &str = "user";
const LAST_ACTIVE_KEY: &str = "last_active";

fn namespaced(key: &str) -> String {
  format!("{}:{}", KEY_PREFIX, key)
}

/// String key-value storage for session state.
///
/// The raw `get`/`set`/`remove` operate on un-namespaced keys; implementors
/// apply the application prefix. The typed helpers handle JSON encoding.
pub trait CredentialStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>>;
  fn set(&self, key: &str, value: &str) -> Result<()>;
  fn remove(&self, key: &str) -> Result<()>;

  fn token(&self) -> Result<Option<String>> {
    decode_opt(self.get(TOKEN_KEY)?)
  }

  fn set_token(&self, token: &str) -> Result<()> {
    self.set(TOKEN_KEY, &serde_json::to_string(token)?)
  }

  fn user(&self) -> Result<Option<User>> {
    decode_opt(self.get(USER_KEY)?)
  }

  fn set_user(&self, user: &User) -> Result<()> {
    self.set(USER_KEY, &serde_json::to_string(user)?)
  }

  fn last_active(&self) -> Result<Option<DateTime<Utc>>> {
    decode_opt(self.get(LAST_ACTIVE_KEY)?)
  }

  /// Record the current moment as the last successful backend interaction.
  fn touch_last_active(&self) -> Result<()> {
    self.set(LAST_ACTIVE_KEY, &serde_json::to_string(&Utc::now())?)
  }

  /// Remove the token, user, and last-active keys. Idempotent.
  fn clear_credentials(&self) -> Result<()> {
    self.remove(TOKEN_KEY)?;
    self.remove(USER_KEY)?;
    self.remove(LAST_ACTIVE_KEY)
  }
}

fn decode_opt<T: serde::de::DeserializeOwned>(raw: Option<String>) -> Result<Option<T>> {
  match raw {
    Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
    None => Ok(None),
  }
}

/// In-memory session, for tests and hosts that opt out of persistence.
#[derive(Default)]
pub struct MemorySession {
  values: Mutex<HashMap<String, String>>,
}

impl MemorySession {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
    self
      .values
      .lock()
      .map_err(|_| Error::Storage("session lock poisoned".into()))
  }
}

impl CredentialStore for MemorySession {
  fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.lock()?.get(&namespaced(key)).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    self.lock()?.insert(namespaced(key), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    self.lock()?.remove(&namespaced(key));
    Ok(())
  }
}

/// SQLite-backed session store.
pub struct SqliteSession {
  conn: Mutex<Connection>,
}

const SESSION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS session_kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

impl SqliteSession {
  /// Open or create the session database at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&crate::cache::default_data_path("session.db")?)
  }

  /// Open or create the session database at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| Error::Storage(format!("failed to create session directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      Error::Storage(format!("failed to open session database at {}: {}", path.display(), e))
    })?;

    let session = Self {
      conn: Mutex::new(conn),
    };
    session.lock()?.execute_batch(SESSION_SCHEMA)?;

    Ok(session)
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|_| Error::Storage("session database lock poisoned".into()))
  }
}

impl CredentialStore for SqliteSession {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self.lock()?;
    let value = conn
      .query_row(
        "SELECT value FROM session_kv WHERE key = ?",
        params![namespaced(key)],
        |row| row.get(0),
      )
      .optional()?;
    Ok(value)
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    self.lock()?.execute(
      "INSERT OR REPLACE INTO session_kv (key, value) VALUES (?, ?)",
      params![namespaced(key), value],
    )?;
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    self
      .lock()?
      .execute("DELETE FROM session_kv WHERE key = ?", params![namespaced(key)])?;
    Ok(())
  }
}
