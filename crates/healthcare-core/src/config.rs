//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the backend endpoint, the fixed adapter procedure used for login, the
//! logout realm, and the persistence and response-cache settings.
//!
//! Configuration is stored at `~/.config/healthcare/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/documents directory paths
pub const APP_NAME: &str = "healthcare";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Adapter hosting the authentication procedure on the backend.
pub const DEFAULT_ADAPTER_NAME: &str = "HealthcareAdapter";

/// Procedure invoked with `[username, password, locale]`.
pub const DEFAULT_PROCEDURE_NAME: &str = "submitAuthentication";

/// Realm logged out of when the process terminates.
pub const DEFAULT_REALM: &str = "SingleStepAuthRealm";

/// Name of the data model; used for both the schema resource and the store file.
pub const DEFAULT_MODEL_NAME: &str = "Healthcare";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Time the terminate path waits for the remote logout after the local transition.
const DEFAULT_LOGOUT_GRACE_SECS: u64 = 5;

/// 8 MiB in-memory response cache.
const DEFAULT_CACHE_MEMORY_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub adapter_name: String,
    pub procedure_name: String,
    pub default_realm: String,
    pub default_locale: String,
    pub request_timeout_secs: u64,
    pub logout_grace_secs: u64,
    pub last_username: Option<String>,
    pub remember_credentials: bool,
    pub persistence: PersistenceConfig,
    pub response_cache: ResponseCacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:10080/Healthcare".to_string(),
            adapter_name: DEFAULT_ADAPTER_NAME.to_string(),
            procedure_name: DEFAULT_PROCEDURE_NAME.to_string(),
            default_realm: DEFAULT_REALM.to_string(),
            default_locale: "en_US".to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            logout_grace_secs: DEFAULT_LOGOUT_GRACE_SECS,
            last_username: None,
            remember_credentials: false,
            persistence: PersistenceConfig::default(),
            response_cache: ResponseCacheConfig::default(),
        }
    }
}

/// What happens once a persistence error has been logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FatalPolicy {
    /// Terminate the process immediately.
    #[default]
    Abort,
    /// Unwind with a panic carrying the error. Used by test harnesses.
    Panic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub enabled: bool,
    pub model_name: String,
    /// Directory holding `<model>.schema.json`.
    pub resources_dir: PathBuf,
    /// Overrides the platform documents directory.
    pub documents_dir: Option<PathBuf>,
    pub fatal_policy: FatalPolicy,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            resources_dir: PathBuf::from("resources"),
            documents_dir: None,
            fatal_policy: FatalPolicy::Abort,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseCacheConfig {
    pub memory_capacity: usize,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            memory_capacity: DEFAULT_CACHE_MEMORY_BYTES,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
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

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn logout_grace(&self) -> Duration {
        Duration::from_secs(self.logout_grace_secs)
    }
}
