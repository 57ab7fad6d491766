//! `pantrysync.toml` configuration.
//!
//! Precedence, lowest to highest: built-in defaults, the config file in the
//! data directory, environment variables, then command-line flags.

use crate::core::error::PantryError;
use crate::core::remote::{HttpEndpoint, InMemoryRemote, RemoteEndpoint, UnconfiguredEndpoint};
use crate::core::collection::CollectionRegistry;
use crate::core::schemas;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const ENV_DIR: &str = "PANTRYSYNC_DIR";
pub const ENV_ENDPOINT: &str = "PANTRYSYNC_ENDPOINT";
pub const ENV_TOKEN: &str = "PANTRYSYNC_TOKEN";

/// Bounds for the remote flush timeout, in seconds.
pub const MIN_TIMEOUT_SECS: u64 = 10;
pub const MAX_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Endpoint value that selects the in-memory remote.
pub const MEMORY_ENDPOINT: &str = "memory:";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    pub auth_token: Option<String>,
    /// Flush as soon as a mutation is queued instead of waiting for an
    /// explicit `sync flush`.
    pub auto_flush: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            auth_token: None,
            auto_flush: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Parse a config document.
    pub fn from_toml(content: &str) -> Result<Self, PantryError> {
        toml::from_str(content).map_err(|e| PantryError::Config(e.to_string()))
    }

    /// Load `<dir>/pantrysync.toml`, falling back to defaults when absent.
    pub fn load(dir: &Path) -> Result<Self, PantryError> {
        let path = dir.join(schemas::CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };
        if config.store.data_dir.is_none() {
            config.store.data_dir = Some(dir.to_path_buf());
        }
        config.apply_env();
        Ok(config)
    }

    /// Overlay `PANTRYSYNC_ENDPOINT` / `PANTRYSYNC_TOKEN`.
    pub fn apply_env(&mut self) {
        if let Ok(endpoint) = env::var(ENV_ENDPOINT) {
            if !endpoint.trim().is_empty() {
                self.sync.endpoint = Some(endpoint);
            }
        }
        if let Ok(token) = env::var(ENV_TOKEN) {
            if !token.trim().is_empty() {
                self.sync.auth_token = Some(token);
            }
        }
    }

    pub fn write(&self, dir: &Path) -> Result<PathBuf, PantryError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(schemas::CONFIG_FILE_NAME);
        let body = toml::to_string_pretty(self).map_err(|e| PantryError::Config(e.to_string()))?;
        fs::write(&path, body)?;
        Ok(path)
    }

    pub fn data_dir(&self) -> Result<PathBuf, PantryError> {
        self.store
            .data_dir
            .clone()
            .ok_or_else(|| PantryError::Config("no data directory configured".to_string()))
    }

    /// Configured timeout clamped to the supported range.
    pub fn flush_timeout(&self) -> Duration {
        Duration::from_secs(
            self.sync
                .timeout_secs
                .clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS),
        )
    }

    /// Build the remote endpoint the config describes.
    pub fn remote(&self, registry: &CollectionRegistry) -> Result<Arc<dyn RemoteEndpoint>, PantryError> {
        match self.sync.endpoint.as_deref().map(str::trim) {
            None | Some("") => Ok(Arc::new(UnconfiguredEndpoint)),
            Some(MEMORY_ENDPOINT) => Ok(Arc::new(InMemoryRemote::new(registry.clone()))),
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                let endpoint =
                    HttpEndpoint::new(url, self.sync.auth_token.clone(), self.flush_timeout())
                        .map_err(|e| PantryError::Config(e.to_string()))?;
                Ok(Arc::new(endpoint))
            }
            Some(other) => Err(PantryError::Config(format!(
                "unsupported sync endpoint '{}'",
                other
            ))),
        }
    }
}

/// Resolve the data directory: explicit flag, then `PANTRYSYNC_DIR`, then
/// `./.pantrysync`.
pub fn resolve_data_dir(flag: Option<PathBuf>, cwd: &Path) -> PathBuf {
    if let Some(dir) = flag {
        return dir;
    }
    match env::var(ENV_DIR) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => cwd.join(".pantrysync"),
    }
}
