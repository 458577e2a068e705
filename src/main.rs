mod config;
mod core;
mod notifications;
mod rpc;
mod signals;
mod tags;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::core::pipeline::{Monitor, run_monitor};
use crate::core::tx::TrackedAsset;
use crate::rpc::BlockfrostClient;
use crate::tags::VenueRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("buyradar=info".parse()?))
        .init();

    tracing::info!("⚡ buyradar starting...");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path);
    for issue in config.validate() {
        tracing::warn!("Config: {issue}");
    }

    let asset = TrackedAsset::new(config.cardano.asset_id.clone(), config.cardano.ticker.clone());
    let registry = Arc::new(VenueRegistry::from_config(&config.venues));

    let ledger = Arc::new(BlockfrostClient::new(
        &config.cardano.api_url,
        &config.cardano.api_key,
        config.monitoring.request_timeout(),
        config.monitoring.retry_policy(),
    )?);
    tracing::info!("Blockfrost client configured for {}", config.cardano.api_url);

    let notifier = notifications::build_notifier(&config.notifications, &asset)?;
    if let Err(e) = notifier.announce_startup().await {
        tracing::warn!("Startup announcement failed: {e}");
    }

    tracing::info!("📊 Monitoring asset: {}", asset.unit);
    tracing::info!(
        "Polling every {} min, {} most recent transfers, {} retries @ {}ms",
        config.monitoring.check_interval_minutes.max(1),
        config.monitoring.fetch_count,
        config.monitoring.max_retries,
        config.monitoring.retry_delay_ms
    );

    let monitor = Arc::new(Monitor::new(
        ledger,
        notifier,
        asset,
        registry,
        config.monitoring.fetch_count,
    ));

    run_monitor(monitor, config.monitoring.interval(), shutdown_signal()).await;

    tracing::info!("Shutting down...");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
