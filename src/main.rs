use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use anonq_gate::config::GateConfig;
use anonq_gate::gate::{GateServer, GateState, HttpUpstream, RouteLimiters};
use anonq_gate::ratelimit::spawn_sweeper;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Admission-control gate for the anonymous Q&A service.
#[derive(Parser, Debug)]
#[command(name = "anonq-gate", version)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the configuration)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Base URL of the host application (overrides the configuration)
    #[arg(short, long)]
    upstream: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match args.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .init(),
    }

    info!("Starting anonq-gate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = GateConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    if let Some(upstream) = args.upstream {
        config.server.upstream_url = upstream;
    }
    config.validate()?;
    info!(
        listen_addr = %config.server.listen_addr,
        upstream = %config.server.upstream_url,
        window_ms = config.rate_limiting.window_millis,
        max_tracked_keys = config.rate_limiting.max_tracked_keys,
        "Configuration loaded"
    );

    // One limiter per protected route
    let limiters = RouteLimiters::new(config.rate_limiting.limiter_options());
    let sweeper = spawn_sweeper(limiters.all(), config.rate_limiting.sweep_interval());

    let upstream = HttpUpstream::new(
        &config.server.upstream_url,
        Duration::from_millis(config.server.upstream_timeout_ms),
    )?;
    let state = GateState::new(&limiters, config.routes, Arc::new(upstream));

    GateServer::new(config.server.listen_addr, state)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    info!("anonq-gate stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
