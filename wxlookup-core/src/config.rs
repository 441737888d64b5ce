use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    geolocation::{DEFAULT_IP_LOOKUP_URL, GeolocationOptions},
    model::Units,
    provider::openweather::DEFAULT_BASE_URL,
};

/// Environment variable that overrides the API key stored on disk.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// units = "metric"
///
/// [geolocation]
/// timeout_ms = 10000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub units: Units,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub geolocation: GeolocationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            units: Units::default(),
            base_url: default_base_url(),
            geolocation: GeolocationConfig::default(),
        }
    }
}

/// How the current position is obtained.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    /// When false, location requests fail as unsupported.
    pub enabled: bool,
    pub endpoint: String,
    pub enable_high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_IP_LOOKUP_URL.to_string(),
            enable_high_accuracy: false,
            timeout_ms: 10_000,
            maximum_age_ms: 0,
        }
    }
}

impl GeolocationConfig {
    pub fn options(&self) -> GeolocationOptions {
        GeolocationOptions {
            enable_high_accuracy: self.enable_high_accuracy,
            timeout: Duration::from_millis(self.timeout_ms),
            maximum_age: Duration::from_millis(self.maximum_age_ms),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    ///
    /// `OPENWEATHER_API_KEY` takes precedence over the stored key.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_env(std::env::var(API_KEY_ENV).ok());
        Ok(cfg)
    }

    /// Overrides the stored key with the value of `OPENWEATHER_API_KEY`.
    /// A missing or blank value leaves the stored key alone.
    pub fn apply_env(&mut self, value: Option<String>) {
        if let Some(key) = value.filter(|k| !k.trim().is_empty()) {
            tracing::debug!("using API key from {API_KEY_ENV}");
            self.api_key = Some(key);
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "wxlookup", "wxlookup")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Returns the API key, if present and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key.trim().to_string());
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }
}
