//! Waymark
//!
//! Standalone runner: reads waystones from a JSON catalog file and keeps a
//! JSON export of the per-world marker layers up to date for a static web
//! map.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use waymark::catalog::JsonCatalog;
use waymark::directory::StaticDirectory;
use waymark::surface::JsonExportSurface;
use waymark::{Addon, AddonConfig, Collaborators, ConsoleSender, RefreshCommand};
use waymark_host::service::ServiceManager;

/// Waystone map marker sync
#[derive(Parser, Debug)]
#[command(name = "waymark")]
#[command(about = "Keeps waystone markers on a web map in sync", long_about = None)]
struct Args {
    /// Addon configuration file (created with defaults if missing)
    #[arg(short, long, default_value = "waymark.toml")]
    config: PathBuf,

    /// Waystone catalog file
    #[arg(long, default_value = "waystones.json")]
    catalog: PathBuf,

    /// World file: map worlds, world names and player names
    #[arg(long, default_value = "worlds.toml")]
    worlds: PathBuf,

    /// Directory the marker layers are exported to
    #[arg(short, long, default_value = "map")]
    out: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Keep the export in sync until interrupted (default)
    Run,
    /// Export every world once and exit
    Export,
}

fn main() -> Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("waymark=info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting waymark v{}", env!("CARGO_PKG_VERSION"));

    let config = AddonConfig::load(&args.config)
        .and_then(AddonConfig::with_env_overrides)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let directory = StaticDirectory::load(&args.worlds)
        .with_context(|| format!("Failed to load world file {}", args.worlds.display()))?;

    let catalog = JsonCatalog::open(&args.catalog)
        .with_context(|| format!("Failed to open catalog {}", args.catalog.display()))?;

    let surface = JsonExportSurface::new(
        &args.out,
        directory.worlds.iter().map(|w| (w.key.clone(), w.name.clone())),
    )
    .with_context(|| format!("Failed to prepare export directory {}", args.out.display()))?;

    let collaborators = Collaborators {
        catalog: Some(Arc::new(catalog)),
        surface: Some(Arc::new(surface)),
        directory: Arc::new(directory),
    };

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(collaborators, config).await,
        Command::Export => export(collaborators, config, &args.out).await,
    }
}

async fn run(collaborators: Collaborators, config: AddonConfig) -> Result<()> {
    let services = ServiceManager::new_shared();

    let addon = Addon::initialize(collaborators, config, services.clone())
        .await
        .context("Failed to enable waystone map addon")?;

    wait_for_signals(addon.refresh_command()).await?;

    info!("Shutting down...");
    addon.shutdown().await;
    if let Err(e) = services.shutdown_all().await {
        warn!("Some services did not shut down cleanly: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// One refresh of every world. Layers stay registered so the files remain.
async fn export(collaborators: Collaborators, config: AddonConfig, out: &std::path::Path) -> Result<()> {
    let engine = Addon::prepare(collaborators, &config).context("Failed to enable waystone map addon")?;

    let report = tokio::task::spawn_blocking(move || engine.initialize()).await??;
    if !report.is_complete() {
        warn!(failed = report.failed, "Some worlds were not exported");
    }

    info!(
        worlds = report.refreshed,
        markers = report.markers,
        "Exported waystone layers to {}",
        out.display()
    );
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM. SIGHUP refreshes every world as the console.
#[cfg(unix)]
async fn wait_for_signals(command: RefreshCommand) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate()).context("Failed to install signal handler")?;
    let mut hangup = signal(SignalKind::hangup()).context("Failed to install signal handler")?;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to install Ctrl+C handler")?;
                info!("Received Ctrl+C, shutting down...");
                return Ok(());
            }
            _ = terminate.recv() => {
                info!("Received terminate signal, shutting down...");
                return Ok(());
            }
            _ = hangup.recv() => {
                info!("Received hangup, running /{}", RefreshCommand::NAME);
                let command = command.clone();
                tokio::task::spawn_blocking(move || command.execute(&ConsoleSender)).await?;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signals(_command: RefreshCommand) -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to install Ctrl+C handler")?;
    info!("Received Ctrl+C, shutting down...");
    Ok(())
}
