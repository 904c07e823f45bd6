//! refundlens server - Entry Point
//!
//! Serves refund status lookups and streamed explanations over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use refundlens_core::{Config, DemoReturnScheduler};
use refundlens_server::logging::init_tracing;
use refundlens_server::{AppState, router};
use tokio::net::TcpListener;
use tracing::info;

/// Refund status explanation service
#[derive(Parser, Debug)]
#[command(name = "refundlensd", author, version, about = "Refund status and explanation service")]
struct Args {
    /// Config file (defaults to ./refundlens.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "refundlens=trace,info" (overrides RUST_LOG)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    init_tracing(args.log_level.as_deref(), args.json_logs || config.log.json)
        .context("failed to initialize logging")?;

    let state = AppState::from_config(&config)?;
    let mode = state.orchestrator.mode();

    let scheduler = config.scheduler.enabled.then(|| {
        DemoReturnScheduler::new(Arc::new(state.store.clone()), config.scheduler.schedule()).start()
    });

    let app = router(state, &config.server.allowed_origins)?;
    let listener = TcpListener::bind(config.server.address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.address))?;

    info!(address = %config.server.address, mode = mode.as_str(), "refundlens server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }
    info!("refundlens server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
