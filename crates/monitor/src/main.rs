use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alloy::providers::{Provider, ProviderBuilder};
use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use lending_monitor::alert::{AlertSink, WebhookAlerter};
use lending_monitor::config;
use lending_monitor::constants::PROTOCOL_LABEL;
use lending_monitor::core::event_indexer::EventIndexer;
use lending_monitor::core::health_monitor::{HealthMonitor, MonitorSettings};
use lending_monitor::execution::aave_client::AaveClient;
use lending_monitor::logging;
use lending_monitor::metrics::{serve_metrics, MetricsSink, PrometheusMetrics};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignore if missing).
    let _ = dotenvy::dotenv();

    let config_dir = std::env::var("MONITOR_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    // Any configuration error is fatal here, before the loop starts.
    let config = config::load_config(&config_dir)?;

    // Hold the guard for the process lifetime.
    let _guard = logging::init_tracing(&config.app.logging)?;

    info!(
        accounts = config.accounts.addresses.len(),
        reserves = config.markets.reserves.len(),
        feeds = config.markets.oracle_feeds.len(),
        interval_secs = config.timing.interval_seconds,
        alerting = config.alerting.webhook_url.is_some(),
        indexer = config.indexer.enabled,
        "lending monitor starting"
    );

    // -----------------------------------------------------------------------
    // Chain provider (http(s) for polling; ws(s) also enables live events)
    // -----------------------------------------------------------------------

    let provider = ProviderBuilder::new()
        .connect(&config.chain.rpc_url)
        .await
        .context("failed to connect to RPC endpoint")?
        .erased();

    let aave_client = Arc::new(AaveClient::new(
        provider,
        &config.chain.contracts,
        Duration::from_secs(config.timing.rpc_timeout_seconds),
    )?);

    info!("blockchain provider initialized");

    // -----------------------------------------------------------------------
    // Metrics and alerting
    // -----------------------------------------------------------------------

    let metrics = Arc::new(PrometheusMetrics::new()?);
    let metrics_sink: Arc<dyn MetricsSink> = metrics.clone();

    let alerter: Option<Arc<dyn AlertSink>> = match &config.alerting.webhook_url {
        Some(url) => Some(Arc::new(WebhookAlerter::new(url.clone())?)),
        None => {
            warn!("no webhook configured, alerts will not be dispatched");
            None
        }
    };

    let listen_addr: SocketAddr = config
        .metrics
        .listen_addr
        .parse()
        .context("failed to parse metrics listen address")?;

    // -----------------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------------

    let shutdown = CancellationToken::new();

    let settings = MonitorSettings::from_config(&config)?;
    let health_monitor = HealthMonitor::new(
        aave_client.clone(),
        aave_client.clone(),
        alerter,
        metrics_sink.clone(),
        settings,
        shutdown.clone(),
    );

    let indexer = config.indexer.enabled.then(|| {
        EventIndexer::new(
            aave_client.clone(),
            metrics_sink.clone(),
            PROTOCOL_LABEL,
            config.indexer.from_block,
            shutdown.clone(),
        )
    });

    info!("all components initialized");

    // -----------------------------------------------------------------------
    // Spawn tasks
    // -----------------------------------------------------------------------

    let monitor_handle = tokio::spawn(async move {
        if let Err(e) = health_monitor.run().await {
            error!(error = %e, "health monitor exited with error");
        }
    });

    let indexer_handle = tokio::spawn(async move {
        if let Some(indexer) = indexer {
            if let Err(e) = indexer.run().await {
                error!(error = %e, "event indexer exited with error");
            }
        }
    });

    let metrics_shutdown = shutdown.clone();
    let metrics_handle = tokio::spawn(async move {
        if let Err(e) = serve_metrics(listen_addr, metrics, metrics_shutdown).await {
            error!(error = %e, "metrics server exited with error");
        }
    });

    info!("all tasks running, press Ctrl+C to shutdown");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    info!("shutdown signal received, stopping gracefully...");
    shutdown.cancel();

    let (monitor_res, indexer_res, metrics_res) =
        tokio::join!(monitor_handle, indexer_handle, metrics_handle);

    if let Err(e) = monitor_res {
        error!(error = %e, "health monitor task panicked");
    }
    if let Err(e) = indexer_res {
        error!(error = %e, "event indexer task panicked");
    }
    if let Err(e) = metrics_res {
        error!(error = %e, "metrics server task panicked");
    }

    info!("shutdown complete");
    Ok(())
}
