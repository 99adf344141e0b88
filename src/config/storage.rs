//! Storage-related configuration

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use super::error::ConfigError;

/// Where shard pages are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; lost on restart. For tests and demos.
    InMemory,
    /// A single redb database file under the data directory.
    #[default]
    Redb,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inmemory" | "in-memory" | "memory" => Ok(Self::InMemory),
            "redb" => Ok(Self::Redb),
            _ => Err(ConfigError::InvalidValue {
                key: "storage.backend".to_string(),
                value: s.to_string(),
                reason: "expected one of: inmemory, redb".to_string(),
            }),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InMemory => write!(f, "inmemory"),
            Self::Redb => write!(f, "redb"),
        }
    }
}

/// Storage-related configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Page storage backend
    pub backend: StorageBackend,
    /// Directory holding the redb database file
    pub data_dir: PathBuf,
}

impl StorageConfig {
    /// Apply environment variable overrides to existing configuration
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("SHARDLITE_STORAGE_BACKEND") {
            self.backend = val.parse()?;
        }
        if let Ok(val) = std::env::var("SHARDLITE_DATA_DIR") {
            self.data_dir = val.into();
        }
        Ok(())
    }

    fn default_data_dir() -> PathBuf {
        "./data".into()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: Self::default_data_dir(),
        }
    }
}
