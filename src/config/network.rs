//! Network-related configuration

use serde::Deserialize;
use serde::Serialize;

use super::error::ConfigError;
use crate::constants::DEFAULT_HTTP_PORT;
use crate::constants::DEFAULT_MAX_BODY_BYTES;

/// Network-related configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// HTTP server port
    pub http_port: u16,
    /// HTTP server bind address
    pub http_bind_addr: String,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

impl NetworkConfig {
    /// Apply environment variable overrides to existing configuration
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("SHARDLITE_PORT") {
            self.http_port = val.parse().map_err(|e| ConfigError::InvalidValue {
                key: "SHARDLITE_PORT".to_string(),
                value: val.clone(),
                reason: format!("must be a valid port number: {}", e),
            })?;
        }
        if let Ok(val) = std::env::var("SHARDLITE_BIND_ADDR") {
            self.http_bind_addr = val;
        }
        if let Ok(val) = std::env::var("SHARDLITE_MAX_BODY_BYTES") {
            self.max_body_bytes = val.parse().map_err(|e| ConfigError::InvalidValue {
                key: "SHARDLITE_MAX_BODY_BYTES".to_string(),
                value: val.clone(),
                reason: format!("must be a byte count: {}", e),
            })?;
        }
        Ok(())
    }

    fn default_http_bind_addr() -> String {
        "0.0.0.0".to_string()
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            http_bind_addr: Self::default_http_bind_addr(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}
