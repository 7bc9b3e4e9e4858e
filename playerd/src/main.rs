//! playerd - remote control daemon for a media engine
//!
//! Opens the engine (unless autostart is off), serves the HTTP control API
//! and closes the engine on Ctrl+C/SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use playerd::api::{self, AppContext};
use playerd::engine::Engine;
use playerd::{PlaybackService, Player};
use playerd_common::config::{ConfigResolver, ConfigSource};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "playerd")]
#[command(about = "Remote control daemon for mpv")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "PLAYERD_PORT")]
    port: Option<u16>,

    /// Path to the TOML config file
    #[arg(short, long, env = "PLAYERD_CONFIG")]
    config: Option<PathBuf>,

    /// Directory with the control panel's static files
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Playlist loaded by GET /play
    #[arg(long)]
    playlist: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,

    /// Do not open the engine at startup
    #[arg(long)]
    no_autostart: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Loaded before tracing so the file can set the log level
    let loaded = ConfigResolver::new(args.config.clone()).load();

    let level = args
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|(c, _)| c.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("playerd={level},playerd_common={level},tower_http=info").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting playerd v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let (mut config, source) = loaded.context("Failed to load configuration")?;
    match &source {
        ConfigSource::Missing(_) => warn!("Configuration: {}", source),
        _ => info!("Configuration: {}", source),
    }

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(assets) = args.assets {
        config.assets_dir = assets;
    }
    if let Some(playlist) = args.playlist {
        config.playlist = Some(playlist);
    }
    if args.no_autostart {
        config.autostart = false;
    }
    let config = Arc::new(config);

    let player = Arc::new(Player::new(select_engine()));
    info!("Engine backend: {}", player.engine_name());
    let playback = Arc::new(PlaybackService::new(Arc::clone(&player)));

    if config.autostart {
        let (flags, options) = (config.engine.flags.clone(), config.engine.options.clone());
        let opener = Arc::clone(&player);
        tokio::task::spawn_blocking(move || opener.open(&flags, &options))
            .await
            .context("Engine startup task failed")?
            .context("Failed to open engine")?;
    } else {
        info!("Autostart disabled; open the engine with POST /api/player/open");
    }

    let app = api::build_router(AppContext::new(playback, Arc::clone(&config)));

    let addr = SocketAddr::new(config.bind_address, config.port);
    info!("Starting HTTP server on {}", addr);
    info!("Serving static files from {}", config.assets_dir.display());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if player.is_running() {
        let closer = Arc::clone(&player);
        tokio::task::spawn_blocking(move || closer.close())
            .await
            .context("Engine shutdown task failed")?
            .context("Failed to close engine")?;
    }

    info!("Shutdown complete");
    Ok(())
}

#[cfg(feature = "libmpv")]
fn select_engine() -> Arc<dyn Engine> {
    Arc::new(playerd::engine::libmpv::LibMpvEngine::new())
}

#[cfg(not(feature = "libmpv"))]
fn select_engine() -> Arc<dyn Engine> {
    warn!("Built without the libmpv feature; using the simulated engine");
    Arc::new(playerd::engine::mock::MockEngine::with_simulated_playback())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
