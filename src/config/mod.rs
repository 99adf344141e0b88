//! Centralized application configuration
//!
//! Configuration is layered: hardcoded defaults, then an optional TOML file,
//! then environment variables. The node binary applies CLI flags last.

pub mod bootstrap;
pub mod error;
pub mod network;
pub mod storage;

use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

pub use self::bootstrap::BootstrapConfig;
pub use self::error::ConfigError;
pub use self::network::NetworkConfig;
pub use self::storage::StorageBackend;
pub use self::storage::StorageConfig;
use crate::constants::PAGE_SIZE;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "./shardlite.toml";

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::InvalidValue {
            key: "config_file".to_string(),
            value: path.as_ref().display().to_string(),
            reason: format!("Failed to read file: {}", e),
        })?;

        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::InvalidValue { reason, .. } => ConfigError::InvalidValue {
                key: "config_file".to_string(),
                value: path.as_ref().display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text. Missing sections take defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: String::new(),
            reason: format!("Failed to parse TOML: {}", e),
        })
    }

    /// Load configuration with layered approach:
    /// 1. Start with defaults
    /// 2. Load from TOML file if it exists
    /// 3. Override with environment variables
    ///
    /// Configuration precedence (highest to lowest):
    /// - Environment variables
    /// - Config file named by `explicit`, else by the CONFIG_FILE env var
    /// - ./shardlite.toml
    /// - Hardcoded defaults
    pub fn load_with_layers(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load_toml_with_fallbacks(explicit)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn load_toml_with_fallbacks(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        // An explicitly requested file must exist.
        if let Some(path) = explicit {
            tracing::info!("Loading configuration from: {}", path.display());
            return Self::from_toml_file(path);
        }

        if let Ok(config_path) = std::env::var("CONFIG_FILE") {
            let path = Path::new(&config_path);
            if path.exists() {
                tracing::info!("Loading configuration from CONFIG_FILE: {}", config_path);
                return Self::from_toml_file(path);
            }
            tracing::warn!("CONFIG_FILE specified but not found: {}", config_path);
        }

        let local_config = Path::new(DEFAULT_CONFIG_FILE);
        if local_config.exists() {
            tracing::info!("Loading configuration from: {}", DEFAULT_CONFIG_FILE);
            return Self::from_toml_file(local_config);
        }

        tracing::info!("No configuration file found, using hardcoded defaults");
        Ok(Self::default())
    }

    /// Apply environment variable overrides to existing configuration
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.network.apply_env_overrides()?;
        self.storage.apply_env_overrides()?;
        self.bootstrap.apply_env_overrides();
        Ok(())
    }

    /// Reject combinations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.max_body_bytes < PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                key: "network.max_body_bytes".to_string(),
                value: self.network.max_body_bytes.to_string(),
                reason: format!("must be at least the page size ({} bytes)", PAGE_SIZE),
            });
        }
        if self.storage.backend == StorageBackend::Redb && self.storage.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "storage.data_dir".to_string(),
                hint: "the redb backend needs a data directory".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: String::new(),
            reason: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path.as_ref(), contents).map_err(|e| ConfigError::InvalidValue {
            key: "config_file".to_string(),
            value: path.as_ref().display().to_string(),
            reason: format!("Failed to write file: {}", e),
        })
    }
}
