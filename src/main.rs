use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use omnipass::seed::seed_catalog;
use omnipass::{AppConfig, AppState, Database, build_router};

#[derive(Parser)]
#[command(name = "omnipass")]
#[command(about = "OMNI Pass loyalty platform API server", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Seed the partner store and mission catalogue into a persistent store
    Seed {
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Write a snapshot and truncate the WAL
    Snapshot {
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Seed { data_dir } => {
            let db = open_persistent(&config, data_dir)?;
            let report = seed_catalog(&db)?;
            db.checkpoint()?;
            println!(
                "Seeded {} stores and {} missions",
                report.stores, report.missions
            );
            Ok(())
        }
        Command::Snapshot { data_dir } => {
            let db = open_persistent(&config, data_dir)?;
            if let Some(metadata) = db.checkpoint()? {
                println!(
                    "Snapshot written: {} records ({} users)",
                    metadata.record_count, metadata.user_count
                );
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("omnipass=debug,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn open_database(config: &AppConfig, data_dir: Option<&Path>) -> Result<Database> {
    match data_dir {
        Some(dir) => Database::open(dir, config.durability, config.checkpoint_threshold)
            .with_context(|| format!("failed to open data directory {}", dir.display())),
        None => Ok(Database::in_memory()),
    }
}

fn open_persistent(config: &AppConfig, data_dir: Option<PathBuf>) -> Result<Database> {
    let dir = data_dir
        .or_else(|| config.data_dir.clone())
        .context("--data-dir or DATA_DIR is required")?;
    open_database(config, Some(&dir))
}

async fn serve(config: AppConfig) -> Result<()> {
    if config.uses_default_secret() {
        warn!("SECRET_KEY is the built-in default; set it before deploying");
    }

    let db = open_database(&config, config.data_dir.as_deref())?;
    if config.seed_catalog {
        seed_catalog(&db)?;
    }

    let address = config.address();
    let state = AppState::new(config, db)?;
    let db = state.db.clone();
    let router = build_router(state);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(%address, persistent = db.is_persistent(), "OMNIPASS API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(metadata) = db.checkpoint()? {
        info!(records = metadata.record_count, "final checkpoint written");
    }
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
