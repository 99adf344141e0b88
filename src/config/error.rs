//! Errors raised while loading or validating node configuration.
//!
//! `key` is either a dotted TOML path (`network.http_port`), a
//! `SHARDLITE_*` environment variable, or `config_file` for the file itself.

use thiserror::Error;

/// A configuration layer could not be applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The key was present but its value cannot be used.
    #[error("bad value for {key}: '{value}' ({reason})")]
    InvalidValue { key: String, value: String, reason: String },

    /// The selected setup needs a key that no layer provided.
    #[error("{key} is not set ({hint})")]
    MissingRequired { key: String, hint: String },
}
