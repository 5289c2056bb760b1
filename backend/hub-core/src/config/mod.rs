//! Hub configuration loaded from the platform config directory.
//!
//! Configuration is a TOML file; every field has a serde default so a partial
//! file (or no file at all) yields a usable config. Nothing here is written
//! back - the hub only reads.

use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::Deserialize;

const CONFIG_DIR_NAME: &str = "switchboard";
const CONFIG_FILE_NAME: &str = "hub.toml";

fn default_ipc_port() -> u16 {
    4920
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Hub runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Localhost port the IPC gateway binds.
    #[serde(default = "default_ipc_port")]
    pub ipc_port: u16,

    /// How long the worker gets to acknowledge a shutdown notice before the
    /// coordinator escalates to a forced close.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Bound on the lifetime of a pending request. A request that receives no
    /// response within this window is resolved with a timeout error.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Override for the log directory; platform data dir when absent.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            ipc_port: default_ipc_port(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            log_dir: None,
        }
    }
}

impl HubConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load config from the platform config dir, falling back to defaults
    /// when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let Some(config_dir) = dirs::config_dir() else {
            warn!("No platform config directory; using default hub config");
            return Ok(Self::default());
        };

        let path = config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if !path.exists() {
            info!("No config file at {}; using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load config from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file cannot be read, or
    /// [`ConfigError::ParseError`] if it is not valid TOML.
    #[track_caller]
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source,
        })?;

        let config: HubConfig = toml::from_str(&raw).map_err(|e| ConfigError::ParseError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        info!("Loaded hub config from {}", path.display());
        Ok(config)
    }
}
