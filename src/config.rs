//! Configuration for the Revify client.
//!
//! Settings come from three layers, later layers winning: built-in
//! defaults, an optional TOML file (`~/.config/revify/config.toml` or an
//! explicit path), and `REVIFY_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default backend API base.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
/// Per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Status polling cadence in seconds while an analysis runs.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
/// Delay between the completion snapshot and the report handoff.
pub const DEFAULT_COMPLETION_DELAY_SECS: u64 = 2;

/// Client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the backend API, including the `/api` prefix.
    pub api_base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Polling cadence in seconds.
    pub poll_interval_secs: u64,
    /// Completion grace delay in seconds.
    pub completion_delay_secs: u64,
    /// Directory downloaded report files are written to.
    pub download_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            completion_delay_secs: DEFAULT_COMPLETION_DELAY_SECS,
            download_dir: PathBuf::from("."),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn completion_delay(&self) -> Duration {
        Duration::from_secs(self.completion_delay_secs)
    }

    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `REVIFY_*` environment overrides on top of this value.
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var("REVIFY_API_URL") {
            if !value.is_empty() {
                self.api_base_url = value;
            }
        }
        if let Some(secs) = env_u64("REVIFY_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = secs;
        }
        if let Some(secs) = env_u64("REVIFY_POLL_INTERVAL_SECS") {
            self.poll_interval_secs = secs;
        }
        if let Some(secs) = env_u64("REVIFY_COMPLETION_DELAY_SECS") {
            self.completion_delay_secs = secs;
        }
        if let Ok(value) = std::env::var("REVIFY_DOWNLOAD_DIR") {
            if !value.is_empty() {
                self.download_dir = PathBuf::from(shellexpand::tilde(&value).into_owned());
            }
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Default config file location (`~/.config/revify/config.toml`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("revify").join("config.toml"))
}

/// Load settings: defaults, then the config file (explicit path or the
/// default location, if it exists), then environment overrides.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let path = match config_path {
        Some(p) => Some(p.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };

    let mut settings = match path {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
            Settings::from_toml(&text)
                .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?
        }
        None => Settings::default(),
    };

    settings.apply_env();
    Ok(settings)
}
