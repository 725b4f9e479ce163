//! CLI configuration.
//!
//! Values here only seed the interactive prompt defaults. Stored as TOML:
//! - Linux: `~/.config/capysync/config.toml`
//! - Windows: `%APPDATA%/capysync/config.toml`
//!
//! `CAPYSYNC_CONFIG` overrides the path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Prompt defaults and scheduler tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default SFTP host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Default SSH port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Default login name.
    #[serde(default = "default_username")]
    pub username: String,

    /// Default remote path for both directions.
    #[serde(default = "default_remote_path")]
    pub remote_path: String,

    /// Worker pool size (unset = twice the available parallelism).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<usize>,

    /// Accepted server key fingerprints (`SHA256:...`); empty accepts any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_fingerprints: Vec<String>,

    /// SSH inactivity timeout in seconds.
    #[serde(default = "default_inactivity_timeout")]
    pub inactivity_timeout: u64,
}

fn default_host() -> String {
    "test.rebex.net".into()
}

fn default_port() -> u16 {
    capysync_sftp::DEFAULT_PORT
}

fn default_username() -> String {
    "demo".into()
}

fn default_remote_path() -> String {
    "/".into()
}

fn default_inactivity_timeout() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: default_username(),
            remote_path: default_remote_path(),
            pool_size: None,
            allowed_fingerprints: Vec::new(),
            inactivity_timeout: default_inactivity_timeout(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or returns defaults if no file exists.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();
        let config = Self::load_from(&path)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
        Ok(config)
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("CAPYSYNC_CONFIG") {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("capysync").join("config.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("capysync")
            .join("config.toml")
    }
}
