//! Client configuration persisted as `ncalayer.json`.

use crate::error::config::ConfigError;
use crate::{DEFAULT_KMD_HTTP_API_URL, DEFAULT_LOCALE, DEFAULT_NCALAYER_URL};

use common::ErrorLocation;

use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

const CONFIG_FILE_NAME: &str = "ncalayer.json";
const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// WebSocket address of the signing agent.
    #[serde(default = "default_ncalayer_url")]
    pub ncalayer_url: String,

    /// Base URL of the KAZTOKEN HTTP API. Must end with `/`.
    #[serde(default = "default_kmd_http_api_url")]
    pub kmd_http_api_url: String,

    /// When false the HTTP API is neither probed nor used.
    #[serde(default = "default_allow_kmd_http_api")]
    pub allow_kmd_http_api: bool,

    #[serde(default = "default_locale")]
    pub default_locale: String,

    #[serde(default = "default_sidecar_probe_timeout_ms")]
    pub sidecar_probe_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            ncalayer_url: default_ncalayer_url(),
            kmd_http_api_url: default_kmd_http_api_url(),
            allow_kmd_http_api: default_allow_kmd_http_api(),
            default_locale: default_locale(),
            sidecar_probe_timeout_ms: default_sidecar_probe_timeout_ms(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_ncalayer_url() -> String {
    DEFAULT_NCALAYER_URL.to_string()
}
fn default_kmd_http_api_url() -> String {
    DEFAULT_KMD_HTTP_API_URL.to_string()
}
fn default_allow_kmd_http_api() -> bool {
    true
}
fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}
fn default_sidecar_probe_timeout_ms() -> u64 {
    3000
}

// ============================================
// IMPLEMENTATION
// ============================================

impl ClientConfig {
    /// Load config from {config_dir}/ncalayer.json.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file is missing.
    /// Returns `Err(ConfigError)` if the file exists but is corrupted/invalid.
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
                location: ErrorLocation::caller(),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: ClientConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::caller(),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/ncalayer.json using temp file + rename.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, directory creation, serialization,
    /// write or rename fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::caller(),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::caller(),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::caller(),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::caller(),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::validation(format!(
                "Invalid version: {} (expected 1-{})",
                self.version, CONFIG_VERSION
            )));
        }

        let agent_url = parse_url("ncalayer_url", &self.ncalayer_url)?;
        if !matches!(agent_url.scheme(), "ws" | "wss") {
            return Err(ConfigError::validation(format!(
                "ncalayer_url must use ws:// or wss://, got {}",
                self.ncalayer_url
            )));
        }

        let api_url = parse_url("kmd_http_api_url", &self.kmd_http_api_url)?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ConfigError::validation(format!(
                "kmd_http_api_url must use http:// or https://, got {}",
                self.kmd_http_api_url
            )));
        }
        // Operation ids are appended directly to the base URL.
        if !self.kmd_http_api_url.ends_with('/') {
            return Err(ConfigError::validation(format!(
                "kmd_http_api_url must end with '/', got {}",
                self.kmd_http_api_url
            )));
        }

        if self.default_locale.trim().is_empty() {
            return Err(ConfigError::validation("default_locale cannot be empty"));
        }

        if self.sidecar_probe_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "sidecar_probe_timeout_ms must be greater than zero",
            ));
        }

        Ok(())
    }

    pub fn sidecar_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.sidecar_probe_timeout_ms)
    }
}

#[track_caller]
fn parse_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value)
        .map_err(|e| ConfigError::validation(format!("Invalid {field} '{value}': {e}")))
}
