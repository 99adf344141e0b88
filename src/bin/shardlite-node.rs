//! shardlite node binary - HTTP entry point for the sharded page-store proxy.
//!
//! Serves `POST /<name>/{query,execute,get-page,set-page}` and a bootstrap
//! console page on GET. Configuration layers: defaults < TOML < environment
//! < CLI args.
//!
//! # Usage
//!
//! ```bash
//! # Start with a TOML config
//! shardlite-node --config /etc/shardlite/node.toml
//!
//! # Ephemeral in-memory node on a custom port
//! shardlite-node --storage-backend inmemory --port 9000
//!
//! # Environment variables
//! export SHARDLITE_DATA_DIR=/var/lib/shardlite
//! shardlite-node
//! ```

use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::ValueEnum;
use shardlite::config::AppConfig;
use shardlite::config::StorageBackend;
use shardlite::server;
use shardlite::server::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "shardlite-node", version, about)]
struct Args {
    /// Path to TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// HTTP bind address.
    #[arg(long)]
    bind: Option<String>,

    /// HTTP port.
    #[arg(long)]
    port: Option<u16>,

    /// Page storage backend.
    /// Options: "inmemory", "redb" (default)
    #[arg(long)]
    storage_backend: Option<StorageBackend>,

    /// Directory for the redb page database.
    /// The database file is "{data_dir}/pages.redb".
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// HTML file served to GET requests instead of the built-in console.
    #[arg(long)]
    bootstrap_document: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

impl Args {
    /// Apply CLI flags on top of the layered configuration.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(bind) = &self.bind {
            config.network.http_bind_addr = bind.clone();
        }
        if let Some(port) = self.port {
            config.network.http_port = port;
        }
        if let Some(backend) = self.storage_backend {
            config.storage.backend = backend;
        }
        if let Some(data_dir) = &self.data_dir {
            config.storage.data_dir = data_dir.clone();
        }
        if let Some(document) = &self.bootstrap_document {
            config.bootstrap.document_path = Some(document.clone());
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Compact => tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init(),
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let mut config = AppConfig::load_with_layers(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    info!(
        bind = %config.network.http_bind_addr,
        port = config.network.http_port,
        backend = %config.storage.backend,
        data_dir = %config.storage.data_dir.display(),
        "starting shardlite node v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = AppState::from_config(&config).context("failed to initialize node")?;
    server::serve(&config.network, state).await.context("server failed")?;

    info!("shutdown complete");
    Ok(())
}
