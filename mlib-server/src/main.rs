//! mlib-server - Music library catalog service
//!
//! Serves the song catalog over HTTP, enriching new songs through the
//! external metadata provider.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mlib_common::config::{Config, ConfigOverrides};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mlib_server::catalog::CatalogRepository;
use mlib_server::services::HttpMetadataClient;
use mlib_server::AppState;

/// Command-line arguments for mlib-server
#[derive(Parser, Debug)]
#[command(name = "mlib-server")]
#[command(about = "Music library catalog service")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "MLIB_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file (created if missing)
    #[arg(short, long, env = "MLIB_DATABASE")]
    database: Option<PathBuf>,

    /// Address to bind to
    #[arg(short, long, env = "MLIB_BIND_ADDRESS")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "MLIB_PORT")]
    port: Option<u16>,

    /// Log level when RUST_LOG is unset
    #[arg(short, long, env = "MLIB_LOG_LEVEL")]
    log_level: Option<String>,

    /// Base URL of the song metadata provider
    #[arg(short, long, env = "MLIB_METADATA_URL")]
    metadata_url: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_file: self.config.clone(),
            database_path: self.database.clone(),
            bind_address: self.bind.clone(),
            port: self.port,
            log_level: self.log_level.clone(),
            metadata_api_url: self.metadata_url.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(&args.overrides()).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "mlib_server={level},mlib_common={level},tower_http={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting mlib-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Database: {}", config.database_path.display());

    let pool = mlib_common::db::init_database(&config.database_path, config.pool_settings())
        .await
        .context("Failed to initialize database")?;
    info!("Database connection established");

    let metadata = HttpMetadataClient::new(&config.metadata_api_url, config.metadata_timeout())
        .context("Failed to build metadata client")?;
    info!("Metadata provider: {}", metadata.info_url());

    let state = AppState::new(CatalogRepository::new(pool), Arc::new(metadata));
    let app = mlib_server::build_router(state);

    let addr = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
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
                error!("Failed to install terminate handler: {}", e);
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
