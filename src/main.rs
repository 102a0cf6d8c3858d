//! Audience Meter: live occupancy counts for named rooms over WebSocket.
//!
//! Main entry point that wires the crates together and starts the servers.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use meter_api::admin::StatsListener;
use meter_api::state::AppState;
use meter_core::config::AppConfig;
use meter_core::error::{AppError, ErrorKind};
use meter_realtime::MeterEngine;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "audience-meter", version, about)]
struct Args {
    /// Configuration file, merged over `config/default.toml`.
    #[arg(long)]
    config: Option<String>,

    /// Log at debug level regardless of configuration.
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = match AppConfig::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    if args.debug {
        config.logging.level = "debug".to_string();
    }

    init_logging(&config, args.debug);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig, force_debug: bool) {
    let filter = if force_debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Audience Meter v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(config);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Engine and notifier
    let engine = MeterEngine::new(&config.meter);
    let notifier_handle = engine.start_notifier(shutdown_rx.clone());

    // Loopback stats listener
    let stats_handle = if config.stats.enabled {
        let listener = StatsListener::bind(&config.stats, engine.registry.clone()).await?;
        Some(tokio::spawn(listener.run(shutdown_rx.clone())))
    } else {
        tracing::info!("Stats listener disabled");
        None
    };

    // HTTP + WebSocket server
    let state = AppState::new(config.clone(), engine.clone())?;
    let app = meter_api::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        AppError::with_source(ErrorKind::Io, format!("Failed to bind {addr}"), e)
    })?;
    tracing::info!("HTTP server listening on {}", addr);

    let shutdown_engine = engine.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
            let _ = shutdown_tx.send(true);
            shutdown_engine.shutdown();
        })
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Io, "Server error", e))?;

    // Wait for background tasks
    tracing::info!("Waiting for background tasks to complete...");
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let _ = tokio::time::timeout(grace, notifier_handle).await;
    if let Some(handle) = stats_handle {
        let _ = tokio::time::timeout(grace, handle).await;
    }

    tracing::info!("Audience Meter shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
