//! Quarry server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quarry_core::AppConfig;
use quarry_server::{build_state, create_router};

/// Quarry - a self-hosted Maven artifact repository
#[derive(Parser, Debug)]
#[command(name = "quarryd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "QUARRY_CONFIG",
        default_value = "config/quarry.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Quarry v{}", env!("CARGO_PKG_VERSION"));

    // Configuration comes from the TOML file when present, with QUARRY_
    // environment variables overriding individual keys.
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();

    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("QUARRY_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(|err| anyhow::anyhow!(err))
        .context("invalid configuration")?;

    if config.repositories.is_empty() {
        tracing::warn!("No repositories configured, the server will reject every artifact request");
    }

    let state = build_state(config.clone())
        .await
        .context("failed to initialize repositories")?;

    tracing::info!(
        repositories = config.repositories.len(),
        tokens = config.tokens.len(),
        "Repositories and tokens initialized"
    );

    let registry = state.registry.clone();
    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Flush storage providers before exiting.
    registry.shutdown_all().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}
