//! Client configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the API base URL, where the session tokens are kept, and the last
//! email used to sign in.
//!
//! Configuration is stored at `~/.config/vaultcore/config.json`. The
//! `VAULTCORE_API_URL` and `VAULTCORE_TOKEN_STORAGE` environment variables
//! override the file.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "vaultcore";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Local development server, `/api` prefix included.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "VAULTCORE_API_URL";
pub const ENV_TOKEN_STORAGE: &str = "VAULTCORE_TOKEN_STORAGE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorage {
    #[default]
    File,
    Keyring,
    Memory,
}

impl FromStr for TokenStorage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(TokenStorage::File),
            "keyring" => Ok(TokenStorage::Keyring),
            "memory" => Ok(TokenStorage::Memory),
            other => Err(anyhow!("Unknown token storage '{}'", other)),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub token_storage: TokenStorage,
    /// Route concurrent token refreshes through a single call.
    #[serde(default)]
    pub coalesce_refresh: bool,
    #[serde(default)]
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            token_storage: TokenStorage::default(),
            coalesce_refresh: false,
            last_email: None,
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load the config file as written, without environment overrides.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse config file")
    }

    /// Persist the last sign-in email without baking overrides into the file.
    pub fn remember_email(&mut self, email: &str) -> Result<()> {
        self.last_email = Some(email.to_string());
        let mut on_disk = Self::load_file()?;
        on_disk.last_email = Some(email.to_string());
        on_disk.save()
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(storage) = lookup(ENV_TOKEN_STORAGE).filter(|v| !v.trim().is_empty()) {
            self.token_storage = storage
                .parse()
                .with_context(|| format!("Invalid {}", ENV_TOKEN_STORAGE))?;
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Request timeout; zero in the file means the default.
    pub fn request_timeout(&self) -> Duration {
        match self.timeout_secs {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Directory holding `session.json` for file-backed token storage.
    pub fn session_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.token_storage, TokenStorage::File);
        assert!(!config.coalesce_refresh);
    }

    #[test]
    fn test_storage_names_round_trip_through_json() {
        let config: Config = serde_json::from_str(r#"{"token_storage": "keyring"}"#).unwrap();
        assert_eq!(config.token_storage, TokenStorage::Keyring);
        assert_eq!("MEMORY".parse::<TokenStorage>().unwrap(), TokenStorage::Memory);
        assert!("cookie".parse::<TokenStorage>().is_err());
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let config: Config = serde_json::from_str(r#"{"timeout_secs": 0}"#).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let config: Config = serde_json::from_str(r#"{"timeout_secs": 5}"#).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(|name| match name {
                ENV_API_URL => Some("https://bank.example.com/api ".to_string()),
                ENV_TOKEN_STORAGE => Some("memory".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.base_url, "https://bank.example.com/api");
        assert_eq!(config.token_storage, TokenStorage::Memory);
    }

    #[test]
    fn test_blank_env_is_ignored_and_bad_storage_rejected() {
        let mut config = Config::default();
        config.apply_overrides(|_| Some("  ".to_string())).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);

        let err = config.apply_overrides(|name| {
            (name == ENV_TOKEN_STORAGE).then(|| "floppy".to_string())
        });
        assert!(err.is_err());
    }
}
