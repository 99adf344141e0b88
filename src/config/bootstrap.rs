//! Bootstrap document configuration

use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Which document GET requests receive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// HTML file to serve instead of the built-in console page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_path: Option<PathBuf>,
}

impl BootstrapConfig {
    /// Apply environment variable overrides to existing configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SHARDLITE_BOOTSTRAP_DOCUMENT") {
            self.document_path = Some(val.into());
        }
    }
}
