use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::endpoint::DEFAULT_BASE_URL;

/// Environment variable that takes precedence over the stored API key.
pub const API_KEY_ENV: &str = "WEATHERLINE_API_KEY";

/// Fixed coordinates every request is made for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    /// Display name only; never sent upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Refresh cadence, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    pub current_secs: u64,
    pub forecast_secs: u64,
    pub retry_delay_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self { current_secs: 60, forecast_secs: 3_600, retry_delay_secs: 10 }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
///
/// [location]
/// lat = 48.037659
/// lon = 14.39616
/// name = "Steyr"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub location: Option<Location>,
    pub base_url: String,
    pub units: String,
    pub request_timeout_secs: u64,
    pub refresh: RefreshSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            location: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            units: "metric".to_string(),
            request_timeout_secs: 10,
            refresh: RefreshSettings::default(),
        }
    }
}

impl Config {
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty()).ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `weatherline configure` or set {API_KEY_ENV}."
            )
        })
    }

    pub fn require_location(&self) -> Result<&Location> {
        self.location.as_ref().ok_or_else(|| {
            anyhow!(
                "No location configured.\n\
                 Hint: run `weatherline configure` and enter the coordinates."
            )
        })
    }

    pub fn is_configured(&self) -> bool {
        self.require_api_key().is_ok() && self.location.is_some()
    }

    /// Load config from the platform location and apply the environment
    /// override for the API key.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_from(&Self::config_file_path()?)?;

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                cfg.api_key = Some(key);
            }
        }

        Ok(cfg)
    }

    /// Load config from `path`, or return defaults if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
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
        let dirs = ProjectDirs::from("dev", "weatherline", "weatherline")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
