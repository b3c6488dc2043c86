use dyad_core::config::CoreConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DyadConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub delivery: DeliveryConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub push_addr: String,
    pub http_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            push_addr: "127.0.0.1:5001".to_string(),
            http_addr: "127.0.0.1:5000".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Sqlite,
    Memory,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Sqlite,
            path: PathBuf::from("dyad.db"),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeliveryConfig {
    pub auto_read_delay_ms: u64,
    pub max_body_bytes: usize,
    pub max_identity_len: usize,
    pub enable_typing: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        let core = CoreConfig::default();
        Self {
            auto_read_delay_ms: core.auto_read_delay_ms,
            max_body_bytes: core.max_body_bytes,
            max_identity_len: core.max_identity_len,
            enable_typing: core.enable_typing,
        }
    }
}

impl DeliveryConfig {
    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            auto_read_delay_ms: self.auto_read_delay_ms,
            max_body_bytes: self.max_body_bytes,
            max_identity_len: self.max_identity_len,
            enable_typing: self.enable_typing,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io")]
    Io,
    #[error("parse")]
    Parse,
}

/// A missing config file is not an error; the defaults serve a local setup.
pub fn load_config(path: &Path) -> Result<DyadConfig, ConfigError> {
    if !path.exists() {
        return Ok(DyadConfig::default());
    }
    let content = fs::read_to_string(path).map_err(|_| ConfigError::Io)?;
    toml::from_str(&content).map_err(|_| ConfigError::Parse)
}
