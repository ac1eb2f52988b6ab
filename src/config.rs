//! Client configuration: backend URL, cache policy, storage location.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable overriding the configured backend URL.
const ENV_BASE_URL: &str = "CUIDE_SE_API_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the REST backend.
  pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Seconds before a cached query result is considered stale.
  pub stale_time_secs: u64,
  /// Whether releasing a view's query key evicts its cached entry.
  pub evict_on_release: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_time_secs: 300,
      evict_on_release: true,
    }
  }
}

impl CacheConfig {
  pub fn stale_time(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.stale_time_secs as i64)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
  /// Directory for the cache and session databases. Defaults to the
  /// platform data directory.
  pub data_dir: Option<PathBuf>,
}

impl Config {
  /// Build a configuration directly from a backend URL, with defaults for
  /// everything else.
  pub fn for_base_url(base_url: impl Into<String>) -> Self {
    Self {
      api: ApiConfig {
        base_url: base_url.into(),
      },
      cache: CacheConfig::default(),
      storage: StorageConfig::default(),
    }
  }

  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./cuide-se.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/cuide-se/config.yaml
  ///
  /// `CUIDE_SE_API_URL`, when set, overrides the configured backend URL.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(Error::Unknown(format!("config file not found: {}", p.display())));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => {
        return Err(Error::Unknown(
          "no configuration file found; create one at ~/.config/cuide-se/config.yaml".into(),
        ))
      }
    };

    if let Ok(url) = std::env::var(ENV_BASE_URL) {
      config.api.base_url = url;
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("cuide-se.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("cuide-se").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| Error::Unknown(format!("failed to read config file {}: {}", path.display(), e)))?;

    serde_yaml::from_str(&contents)
      .map_err(|e| Error::Unknown(format!("failed to parse config file {}: {}", path.display(), e)))
  }
}
