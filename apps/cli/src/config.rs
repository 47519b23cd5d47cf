//! CLI configuration.
//!
//! Stored as TOML:
//! - Linux: `~/.config/cloudfiles/cli.toml`
//! - Windows: `%APPDATA%/cloudfiles/cli.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use cloudfiles_engine::TransferPolicy;
use cloudfiles_protocol::constants::{
    BIG_FILE_SIZE, DEFAULT_CHUNK_SIZE, DEFAULT_THREADS, RELAY_POLL_INTERVAL, RELAY_TIMEOUT,
};
use cloudfiles_relay::RelayConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Bytes per upload chunk and per download range.
    pub chunk_size: u64,
    /// Concurrent range fetches per download.
    pub threads: usize,
    /// Files up to this size move in a single call.
    pub big_file_size: u64,
    /// Directory acting as the remote drive.
    pub remote_dir: PathBuf,
    /// Where downloads are saved.
    pub download_dir: PathBuf,
    pub relay_poll_interval_ms: u64,
    pub relay_timeout_ms: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        let data = data_base_dir().join("cloudfiles");
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            threads: DEFAULT_THREADS,
            big_file_size: BIG_FILE_SIZE,
            remote_dir: data.join("remote"),
            download_dir: data.join("downloads"),
            relay_poll_interval_ms: RELAY_POLL_INTERVAL.as_millis() as u64,
            relay_timeout_ms: RELAY_TIMEOUT.as_millis() as u64,
        }
    }
}

impl CliConfig {
    /// Loads the config at `path` (or the default location), creating it
    /// with defaults when missing.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: CliConfig = toml::from_str(&content)?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        } else {
            let config = CliConfig::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn policy(&self) -> TransferPolicy {
        TransferPolicy {
            big_file_size: self.big_file_size,
            chunk_size: self.chunk_size,
            threads: self.threads,
        }
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            poll_interval: Duration::from_millis(self.relay_poll_interval_ms),
            timeout: Duration::from_millis(self.relay_timeout_ms),
        }
    }

    /// Relay records live next to the remote drive.
    pub fn relay_dir(&self) -> PathBuf {
        self.remote_dir.join("relay")
    }
}

fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cloudfiles")
            .join("cli.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("cloudfiles").join("cli.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/cloudfiles/cli.toml"))
    }
}

fn data_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("LOCALAPPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".local").join("share")
    }
}
