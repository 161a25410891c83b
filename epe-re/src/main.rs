//! epe-re (Reading Environment) - witness, annotation and alignment service
//!
//! Serves the reading UI from the static folder and the JSON API under
//! `/api`. All records live in JSON files inside the data folder.

use anyhow::{Context, Result};
use clap::Parser;
use epe_common::config::{default_config_path, load_toml_config, Overrides, ServerConfig, TomlConfig};
use epe_common::logging::init_tracing;
use epe_re::store::{JsonDirectory, RecordStore};
use epe_re::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// Command-line arguments for epe-re
#[derive(Parser, Debug)]
#[command(name = "epe-re")]
#[command(about = "Reading environment for digital editions")]
#[command(version)]
struct Args {
    /// TOML config file (defaults to the platform config folder)
    #[arg(short, long, env = "EPE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "EPE_RE_BIND")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "EPE_RE_PORT")]
    port: Option<u16>,

    /// Folder holding the JSON record files
    #[arg(short, long, env = "EPE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Folder served for non-API paths
    #[arg(long, env = "EPE_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Log level or filter directive
    #[arg(long, env = "EPE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Append logs to this file as well as stderr
    #[arg(long, env = "EPE_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = match args.config.clone().or_else(default_config_path) {
        Some(path) => load_toml_config(&path)?,
        None => TomlConfig::default(),
    };
    let config = ServerConfig::resolve(
        Overrides {
            bind_address: args.bind,
            port: args.port,
            data_dir: args.data_dir,
            static_dir: args.static_dir,
            log_level: args.log_level,
            log_file: args.log_file,
        },
        toml_config,
    );

    init_tracing(&config.logging).context("Failed to initialize logging")?;

    info!(
        "Starting EPE Reading Environment (epe-re) v{}",
        env!("CARGO_PKG_VERSION")
    );
    config.ensure_data_dir().context("Failed to create data directory")?;

    let backend = JsonDirectory::new(&config.data_dir);
    info!("Data directory: {}", backend.root().display());
    let backend = Arc::new(backend);
    let store = RecordStore::open(backend).context("Failed to load records")?;

    let static_dir = config
        .static_dir
        .exists()
        .then(|| config.static_dir.clone());
    let state = AppState::new(store)
        .with_log_file(config.logging.file.clone())
        .with_static_dir(static_dir);
    let app = build_router(state);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("epe-re listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
