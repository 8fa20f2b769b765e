//! Tipline core service - Main entry point
//!
//! Serves the tip marketplace REST API: tip submission and review, claims
//! with exclusivity windows, reporter verification, reputation scoring, and
//! confirmed-payment ingestion. Identity arrives as trusted headers from the
//! auth layer in front of this service.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tipline_common::config;
use tipline_common::db::init_database;
use tipline_server::{build_router, AppState};

/// Command-line arguments for tipline-server
#[derive(Parser, Debug)]
#[command(name = "tipline-server")]
#[command(about = "Tip marketplace core service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5750", env = "TIPLINE_PORT")]
    port: u16,

    /// Root folder holding the database and local state
    #[arg(short, long, env = "TIPLINE_ROOT_FOLDER")]
    root_folder: Option<String>,

    /// Database file path (overrides the root folder default)
    #[arg(short, long, env = "TIPLINE_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tipline_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    info!("Starting tipline-server v{}", env!("CARGO_PKG_VERSION"));

    let db_path = match args.database {
        Some(path) => path,
        None => {
            let root =
                config::resolve_root_folder(args.root_folder.as_deref(), "TIPLINE_ROOT_FOLDER")
                    .context("Failed to resolve root folder")?;
            config::database_path(&root)
        }
    };
    info!("Database: {}", db_path.display());

    let db = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    // Build the application router
    let app = build_router(AppState::new(db));

    // Create socket address
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

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
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
