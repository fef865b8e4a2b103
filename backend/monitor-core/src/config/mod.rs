//! Connection configuration with JSON file persistence.
//!
//! The credential is deliberately absent here: it lives in
//! [`common::RedactedPassword`], which refuses serialization, and is handed
//! to the engine programmatically for the process lifetime only.

use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "monitor.json";
const CONFIG_VERSION: u32 = 1;

/// Timing knobs for the protocol engine.
///
/// These were historically magic constants; they are named and overridable
/// here so deployments with slow servers can loosen them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timing {
    /// How long the server may hold a long-poll open.
    #[serde(default = "default_poll_duration_secs")]
    pub poll_duration_secs: u64,

    /// Processing headroom added on top of the long-poll duration when
    /// deriving the request timeout.
    #[serde(default = "default_poll_grace_secs")]
    pub poll_grace_secs: u64,

    /// Upper bound on the dispatcher's idle wait between wake signals.
    #[serde(default = "default_idle_wait_secs")]
    pub idle_wait_secs: u64,

    /// How long `close()` waits for the background loops before abandoning
    /// them.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Timeout for every request that is not a long-poll.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Timing {
    pub fn poll_duration(&self) -> Duration {
        Duration::from_secs(self.poll_duration_secs)
    }

    pub fn poll_grace(&self) -> Duration {
        Duration::from_secs(self.poll_grace_secs)
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_secs(self.idle_wait_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_duration_secs: default_poll_duration_secs(),
            poll_grace_secs: default_poll_grace_secs(),
            idle_wait_secs: default_idle_wait_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Root URL of the control server, e.g. `http://127.0.0.1:8200/`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub timing: Timing,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            base_url: default_base_url(),
            timing: Timing::default(),
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_base_url() -> String {
    String::from("http://127.0.0.1:8200/")
}
fn default_poll_duration_secs() -> u64 {
    300
}
fn default_poll_grace_secs() -> u64 {
    5
}
fn default_idle_wait_secs() -> u64 {
    60
}
fn default_shutdown_grace_secs() -> u64 {
    10
}
fn default_request_timeout_secs() -> u64 {
    30
}

impl ConnectionConfig {
    /// Build a config for the given server with default timings.
    pub fn for_server(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load config from {config_dir}/monitor.json.
    ///
    /// A missing file yields the defaults; a file that exists but is
    /// corrupted or invalid is an error.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: ConnectionConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/monitor.json using atomic write.
    ///
    /// Uses temp file + rename for atomicity (no corruption on crash).
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        // Atomic rename (POSIX guarantees atomicity)
        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, CONFIG_VERSION
                ),
            });
        }

        if self.base_url.is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("base_url cannot be empty"),
            });
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("Invalid URL format: {}", self.base_url),
            });
        }

        if self.timing.poll_duration_secs == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("poll_duration_secs must be non-zero"),
            });
        }

        if self.timing.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("request_timeout_secs must be non-zero"),
            });
        }

        Ok(())
    }

    /// Base URL normalized to end with a slash, so joins stay rooted.
    pub(crate) fn normalized_base_url(&self) -> String {
        if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        }
    }
}
