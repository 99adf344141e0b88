//! HTTP surface of the proxy.
//!
//! The router resolves `/<name>/<operation>` to a shard through the
//! [`ShardRegistry`] and forwards the request in-process. Plain GET requests
//! get the bootstrap document instead.
//!
//! # Example
//!
//! ```no_run
//! use shardlite::config::AppConfig;
//! use shardlite::server::AppState;
//!
//! # async fn example() -> Result<(), shardlite::server::ServerError> {
//! let config = AppConfig::default();
//! let state = AppState::from_config(&config)?;
//! shardlite::server::serve(&config.network, state).await?;
//! # Ok(())
//! # }
//! ```

mod bootstrap;
mod lifecycle;
mod router;

use std::path::PathBuf;
use std::sync::Arc;

use snafu::ResultExt;
use snafu::Snafu;

pub use self::bootstrap::BootstrapDocument;
pub use self::lifecycle::serve;
pub use self::lifecycle::shutdown_signal;
pub use self::router::Route;
pub use self::router::build_router;
pub use self::router::page_index_param;
pub use self::router::parse_route;
use crate::config::AppConfig;
use crate::config::StorageBackend;
use crate::constants::REDB_FILE_NAME;
use crate::kv::InMemoryProvider;
use crate::kv::RedbProvider;
use crate::kv::StoreError;
use crate::kv::StoreProvider;
use crate::sharding::ShardRegistry;
use crate::sql::default_engine;

/// Errors raised while starting or running the server.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ServerError {
    #[snafu(display("failed to bind {addr}: {source}"))]
    Bind { addr: String, source: std::io::Error },

    #[snafu(display("server error: {source}"))]
    Serve { source: std::io::Error },

    #[snafu(display("failed to read bootstrap document {}: {source}", path.display()))]
    ReadBootstrap { path: PathBuf, source: std::io::Error },

    #[snafu(display("failed to open page storage: {source}"))]
    OpenStore { source: StoreError },
}

/// Shared state handed to every request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<ShardRegistry>,
    pub bootstrap: BootstrapDocument,
}

impl AppState {
    pub fn new(registry: Arc<ShardRegistry>, bootstrap: BootstrapDocument) -> Self {
        Self { registry, bootstrap }
    }

    /// Wire the storage backend, engine and bootstrap document named by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, ServerError> {
        let provider: Arc<dyn StoreProvider> = match config.storage.backend {
            StorageBackend::InMemory => InMemoryProvider::new(),
            StorageBackend::Redb => {
                let path = config.storage.data_dir.join(REDB_FILE_NAME);
                tracing::info!(path = %path.display(), "opening redb page storage");
                Arc::new(RedbProvider::open(&path).context(OpenStoreSnafu)?)
            }
        };
        let registry = Arc::new(ShardRegistry::new(provider, default_engine()));
        let bootstrap = BootstrapDocument::load(config.bootstrap.document_path.as_deref())?;
        Ok(Self::new(registry, bootstrap))
    }
}
