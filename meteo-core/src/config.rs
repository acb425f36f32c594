use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::job::CollectionLayout;

pub const EMULATOR_HOST_ENV: &str = "FIRESTORE_EMULATOR_HOST";

/// Settings for the Open-Meteo forecast request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub base_url: String,
    pub timezone: String,
    pub wind_speed_unit: String,

    /// Days requested from the API. Only the first week is stored, but
    /// asking for more tolerates shorter-than-requested answers.
    pub forecast_days: u8,

    /// No timeout is applied unless set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.open-meteo.com".to_string(),
            timezone: "Pacific/Noumea".to_string(),
            wind_speed_unit: "kn".to_string(),
            forecast_days: 14,
            request_timeout_secs: None,
        }
    }
}

/// Settings for the Firestore document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Service-account JSON key.
    pub credentials_path: PathBuf,

    /// Overrides the project id found in the key file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    pub database: String,
    pub collection: String,
    pub forecast_collection: String,

    /// `host:port` of a local emulator. When unset, `FIRESTORE_EMULATOR_HOST`
    /// is consulted; an empty value disables the emulator entirely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emulator_host: Option<String>,

    pub base_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("service_account.json"),
            project_id: None,
            database: "(default)".to_string(),
            collection: "meteo_caledonie".to_string(),
            forecast_collection: "previsions".to_string(),
            emulator_host: None,
            base_url: "https://firestore.googleapis.com".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn emulator_host(&self) -> Option<String> {
        match &self.emulator_host {
            Some(host) if host.is_empty() => None,
            Some(host) => Some(host.clone()),
            None => std::env::var(EMULATOR_HOST_ENV)
                .ok()
                .filter(|host| !host.is_empty()),
        }
    }

    pub fn layout(&self) -> CollectionLayout {
        CollectionLayout {
            collection: self.collection.clone(),
            forecast_collection: self.forecast_collection.clone(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [forecast]
/// timezone = "Pacific/Noumea"
///
/// [store]
/// credentials_path = "/etc/meteo/service_account.json"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub forecast: ForecastConfig,
    pub store: StoreConfig,
}

impl Config {
    /// Load config from the default location, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load config from `path`, or return defaults if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("nc", "tablo", "meteo")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
