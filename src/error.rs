//! Error taxonomy for the data layer.
//!
//! Errors are cloneable so they can live inside query state and be handed
//! to the UI without re-running the operation that produced them.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  /// The request could not complete or the backend answered with a
  /// non-success, non-401 status.
  #[error("network failure: {0}")]
  Network(String),

  /// The backend rejected our credentials (401). By the time this error is
  /// observed, persisted credentials have already been purged.
  #[error("authentication rejected")]
  Auth,

  /// A form rule was violated.
  #[error("validation failed for {field}: {message}")]
  Validation { field: String, message: String },

  /// Local persistence (cache database, session store) failed.
  #[error("storage failure: {0}")]
  Storage(String),

  /// A payload did not match its serialization contract.
  #[error("decode failure: {0}")]
  Decode(String),

  /// Caught value that fits none of the categories above.
  #[error("unknown failure: {0}")]
  Unknown(String),
}

impl Error {
  pub fn is_auth(&self) -> bool {
    matches!(self, Error::Auth)
  }
}

impl From<reqwest::Error> for Error {
  fn from(e: reqwest::Error) -> Self {
    if e.is_decode() {
      Error::Decode(e.to_string())
    } else {
      Error::Network(e.to_string())
    }
  }
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Error::Decode(e.to_string())
  }
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    Error::Storage(e.to_string())
  }
}
