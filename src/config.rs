use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ClientError;

// Watcher configuration, stored as config.json

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatcherConfig {
  pub lockfile_path: Option<PathBuf>,
  pub game_log_path: Option<PathBuf>,
  pub lockfile_poll_ms: u64,
  pub state_poll_ms: u64,
  pub liveness_check_secs: u64,
  pub remote_init_delay_ms: u64,
  pub request_timeout_secs: u64,
  pub auto_action_target: Option<String>,
  pub log_dir: Option<PathBuf>,
  pub debug: bool,
}

impl Default for WatcherConfig {
  fn default() -> Self {
    Self {
      lockfile_path: None,
      game_log_path: None,
      lockfile_poll_ms: 2000,
      state_poll_ms: 1000,
      liveness_check_secs: 30,
      remote_init_delay_ms: 3000,
      request_timeout_secs: 5,
      auto_action_target: None,
      log_dir: None,
      debug: false,
    }
  }
}

impl WatcherConfig {
  /// Load config from `path`. A missing file yields defaults; a malformed one is an error.
  pub fn load(path: &Path) -> Result<Self, ClientError> {
    if !path.exists() {
      tracing::debug!(path = %path.display(), "[Config] No config file, using defaults");
      return Ok(Self::default());
    }

    let data = fs::read_to_string(path).map_err(|e| ClientError::Config {
      path: path.to_path_buf(),
      details: e.to_string(),
    })?;

    serde_json::from_str::<WatcherConfig>(&data).map_err(|e| ClientError::Config {
      path: path.to_path_buf(),
      details: e.to_string(),
    })
  }

  /// `<config dir>/matchwatch/config.json`
  pub fn default_path() -> PathBuf {
    dirs::config_dir()
      .unwrap_or_else(|| PathBuf::from("."))
      .join("matchwatch")
      .join("config.json")
  }

  pub fn resolved_lockfile_path(&self) -> PathBuf {
    self.lockfile_path.clone().unwrap_or_else(|| {
      local_data_dir()
        .join("Riot Games")
        .join("Riot Client")
        .join("Config")
        .join("lockfile")
    })
  }

  pub fn resolved_game_log_path(&self) -> PathBuf {
    self.game_log_path.clone().unwrap_or_else(|| {
      local_data_dir()
        .join("VALORANT")
        .join("Saved")
        .join("Logs")
        .join("ShooterGame.log")
    })
  }

  pub fn lockfile_poll_interval(&self) -> Duration {
    Duration::from_millis(self.lockfile_poll_ms.max(1))
  }

  pub fn state_poll_interval(&self) -> Duration {
    Duration::from_millis(self.state_poll_ms.max(1))
  }

  pub fn liveness_interval(&self) -> Duration {
    Duration::from_secs(self.liveness_check_secs.max(1))
  }

  pub fn remote_init_delay(&self) -> Duration {
    Duration::from_millis(self.remote_init_delay_ms)
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs.max(1))
  }
}

fn local_data_dir() -> PathBuf {
  dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."))
}
