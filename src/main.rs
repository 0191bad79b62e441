//! The fieldgate controller daemon.
//!
//! Hosts the policy engine behind an HTTP API: the detector posts events to
//! `/detect`, sidecars pull compiled snapshots, operators drive
//! transduction and export/reload.

use fieldgate::{api, Coordinator, EngineConfig};

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "fieldgate", about = "Adaptive L7 field-level policy engine")]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to serve the controller API on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Enable debug-level logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = load_config(cli.config.as_deref())?;
    let coordinator = Arc::new(Coordinator::new(config));
    let app = api::router(coordinator);

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("failed to bind {}", cli.listen))?;
    tracing::info!(listen = %cli.listen, "fieldgate controller listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("fieldgate controller stopped");
    Ok(())
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let config = EngineConfig::from_toml_str(&raw)
                .with_context(|| format!("failed to parse config file {}", path.display()))?;
            tracing::info!(config = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
