use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::db::Database;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
  /// Custom title for header (defaults to backend host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Directory CSV reports are written to (defaults to the download directory)
  pub export_dir: Option<PathBuf>,
  /// SQLite file for persisted settings
  pub state_path: Option<PathBuf>,
  pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds before a cached read is refetched
  #[serde(default = "default_stale_after")]
  pub stale_after_secs: u64,
}

fn default_stale_after() -> u64 {
  300
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_after_secs: default_stale_after(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./rollcall.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/rollcall/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/rollcall/config.yaml\n\
                 with at least:\n\nbackend:\n  url: https://your-backend.example.com"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("rollcall.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("rollcall").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    url::Url::parse(&config.backend.url)
      .map_err(|e| eyre!("Invalid backend.url '{}': {}", config.backend.url, e))?;
    Ok(config)
  }

  pub fn stale_time(&self) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(self.cache.stale_after_secs).unwrap_or(i64::MAX / 1000))
  }

  /// Header title: configured title or the backend host
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    url::Url::parse(&self.backend.url)
      .ok()
      .and_then(|u| u.host_str().map(String::from))
      .unwrap_or_else(|| self.backend.url.clone())
  }

  pub fn state_path(&self) -> Result<PathBuf> {
    match &self.state_path {
      Some(path) => Ok(path.clone()),
      None => Database::default_path(),
    }
  }

  pub fn export_dir(&self) -> PathBuf {
    self
      .export_dir
      .clone()
      .or_else(dirs::download_dir)
      .or_else(|| std::env::current_dir().ok())
      .unwrap_or_else(|| PathBuf::from("."))
  }

  /// Get the identity token from environment variables.
  ///
  /// Checks ROLLCALL_IDENTITY_TOKEN first, then ROLLCALL_TOKEN as fallback.
  pub fn identity_token() -> Result<String> {
    std::env::var("ROLLCALL_IDENTITY_TOKEN")
      .or_else(|_| std::env::var("ROLLCALL_TOKEN"))
      .map_err(|_| {
        eyre!(
          "Identity token not found. Set ROLLCALL_IDENTITY_TOKEN or ROLLCALL_TOKEN environment variable."
        )
      })
  }
}
