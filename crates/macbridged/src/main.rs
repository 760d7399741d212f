use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use macbridged::api;
use macbridged::api::AppState;
use macbridged::config::Config;
use macbridged::coordinator::Coordinator;
use macbridged::reconcile::Reconciler;
use macbridged::registry::MemoryDeviceRegistry;
use macbridged::registry::MemoryEntityRegistry;
use macbridged::registry::MemoryStateStore;

/// Groups sensor entities published by the macOS agent under one device.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "macbridged.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.logging.directives()))
        .init();

    tracing::info!("macbridged starting");
    tracing::info!("Loaded config from: {}", args.config.display());

    let states = Arc::new(MemoryStateStore::new());
    let devices = Arc::new(MemoryDeviceRegistry::new());
    let entities = Arc::new(MemoryEntityRegistry::new());

    let reconciler = Reconciler::new(devices, entities, states.clone());
    let coordinator = Coordinator::new(reconciler, config.reconcile.interval());
    let health = coordinator.health();

    let (api_shutdown_tx, api_shutdown_rx) = oneshot::channel();
    let (coordinator_shutdown_tx, coordinator_shutdown_rx) = oneshot::channel();

    let api_state = AppState::new(states, health, config.api.auth_token.clone());
    let api_task = tokio::spawn(api::serve(
        config.api.listen.clone(),
        config.api.port,
        api_state,
        api_shutdown_rx,
    ));
    let coordinator_task = tokio::spawn(coordinator.run(coordinator_shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Received shutdown signal");

    let _ = coordinator_shutdown_tx.send(());
    let _ = api_shutdown_tx.send(());

    coordinator_task.await.ok();
    match api_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("HTTP API server error: {e:#}"),
        Err(e) => tracing::error!("HTTP API task failed: {e}"),
    }

    tracing::info!("macbridged shutdown complete");

    Ok(())
}
