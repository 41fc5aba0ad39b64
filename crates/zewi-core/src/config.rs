//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the API
//! base URL, request timeout, how profile updates are synced, and the
//! optional navigation wait timeout.
//!
//! Configuration is stored at `~/.config/zewi/config.json`. The
//! `ZEWI_API_BASE_URL` and `ZEWI_DATA_DIR` environment variables override
//! the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/data directory paths
const APP_NAME: &str = "zewi";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend address used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_BASE_URL: &str = "ZEWI_API_BASE_URL";
pub const ENV_DATA_DIR: &str = "ZEWI_DATA_DIR";

/// How `update_profile` talks to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSyncMode {
    /// Send the update to the server and roll back locally if it fails.
    #[default]
    Remote,
    /// Apply the update locally only; the remote step always succeeds.
    LocalOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Upper bound for how long navigation waits on the initial auth check.
    /// `None` waits indefinitely.
    pub init_timeout_ms: Option<u64>,
    pub profile_sync: ProfileSyncMode,
    pub data_dir: Option<PathBuf>,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            init_timeout_ms: None,
            profile_sync: ProfileSyncMode::default(),
            data_dir: None,
            last_email: None,
        }
    }
}

impl Config {
    /// Effective configuration: the file at the default location, or
    /// defaults when it is missing or unreadable, with environment overrides
    /// applied on top either way.
    pub fn load_or_default() -> Self {
        let lookup = |key: &str| std::env::var(key).ok();
        match Self::config_path() {
            Ok(path) => Self::load_with(&path, lookup),
            Err(e) => {
                warn!(error = %e, "No config location, using defaults");
                let mut config = Self::default();
                config.apply_env(lookup);
                config
            }
        }
    }

    /// [`load_or_default`](Self::load_or_default) against an explicit path
    /// and variable lookup.
    pub fn load_with<F>(path: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load_from(path).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            Self::default()
        });
        config.apply_env(lookup);
        config
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Change the saved file at the default location. The effective config
    /// carries environment and command-line overrides, so it is never
    /// written back as a whole.
    pub fn update_saved<F>(change: F) -> Result<()>
    where
        F: FnOnce(&mut Self),
    {
        Self::update_at(&Self::config_path()?, change)
    }

    pub fn update_at<F>(path: &Path, change: F) -> Result<()>
    where
        F: FnOnce(&mut Self),
    {
        let mut saved = Self::load_from(path)?;
        change(&mut saved);
        saved.save_to(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir.trim()));
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn init_timeout(&self) -> Option<Duration> {
        self.init_timeout_ms.map(Duration::from_millis)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted user snapshot.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}
