//! Prometheus metrics for the lending monitor.
//!
//! Components record through the [`MetricsSink`] trait and never touch the
//! registry directly. [`PrometheusMetrics`] is the production sink; every
//! instrument is safe under concurrent writers (monotonic counters,
//! last-write-wins gauges).
//!
//! Exposed instruments (all prefixed `lending_`):
//! - `health_factor{protocol,user}` gauge
//! - `utilization_rate{protocol,asset}` gauge
//! - `total_deposits{protocol,asset}` / `total_borrows{protocol,asset}` gauges
//! - `supply_rate_apr{protocol,asset}` / `borrow_rate_apr{protocol,asset}` gauges
//! - `oracle_price_usd{asset}` gauge
//! - `oracle_staleness_seconds{feed}` gauge
//! - `liquidation_events_total{protocol}` counter
//! - `events_total{protocol,event}` counter
//! - `monitor_cycle_duration_seconds` histogram

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, GaugeVec, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::constants::METRICS_NAMESPACE;
use crate::errors::MonitorError;
use crate::types::wad_ray::to_f64;
use crate::types::ReserveSnapshot;

/// Recording side of the metrics registry.
pub trait MetricsSink: Send + Sync {
    fn set_health_factor(&self, protocol: &str, user: &str, value: f64);
    fn set_reserve(&self, protocol: &str, asset: &str, snapshot: &ReserveSnapshot);
    fn set_oracle_staleness(&self, feed: &str, seconds: f64);
    fn inc_liquidation_events(&self, protocol: &str);
    fn inc_indexed_events(&self, protocol: &str, event: &str);
    fn observe_cycle_duration(&self, seconds: f64);
}

pub struct PrometheusMetrics {
    registry: Registry,
    pub health_factor: GaugeVec,
    pub utilization_rate: GaugeVec,
    pub total_deposits: GaugeVec,
    pub total_borrows: GaugeVec,
    pub supply_rate_apr: GaugeVec,
    pub borrow_rate_apr: GaugeVec,
    pub oracle_price_usd: GaugeVec,
    pub oracle_staleness_seconds: GaugeVec,
    pub liquidation_events_total: IntCounterVec,
    pub events_total: IntCounterVec,
    pub monitor_cycle_duration_seconds: Histogram,
}

fn opts(name: &str, help: &str) -> Opts {
    Opts::new(name, help).namespace(METRICS_NAMESPACE)
}

impl PrometheusMetrics {
    /// Create and register every instrument on a fresh registry.
    pub fn new() -> Result<Self, MonitorError> {
        let registry = Registry::new();

        let health_factor = GaugeVec::new(
            opts("health_factor", "Current health factor of a monitored account"),
            &["protocol", "user"],
        )?;
        let utilization_rate = GaugeVec::new(
            opts("utilization_rate", "Borrowed / supplied ratio of a reserve"),
            &["protocol", "asset"],
        )?;
        let total_deposits = GaugeVec::new(
            opts("total_deposits", "Total supplied liquidity of a reserve in token units"),
            &["protocol", "asset"],
        )?;
        let total_borrows = GaugeVec::new(
            opts("total_borrows", "Total outstanding debt of a reserve in token units"),
            &["protocol", "asset"],
        )?;
        let supply_rate_apr = GaugeVec::new(
            opts("supply_rate_apr", "Supply APR of a reserve in percent"),
            &["protocol", "asset"],
        )?;
        let borrow_rate_apr = GaugeVec::new(
            opts("borrow_rate_apr", "Variable borrow APR of a reserve in percent"),
            &["protocol", "asset"],
        )?;
        let oracle_price_usd = GaugeVec::new(
            opts("oracle_price_usd", "Protocol oracle price in USD"),
            &["asset"],
        )?;
        let oracle_staleness_seconds = GaugeVec::new(
            opts("oracle_staleness_seconds", "Seconds since the price feed last updated"),
            &["feed"],
        )?;
        let liquidation_events_total = IntCounterVec::new(
            opts("liquidation_events_total", "Liquidation events observed"),
            &["protocol"],
        )?;
        let events_total = IntCounterVec::new(
            opts("events_total", "Pool events classified, by kind"),
            &["protocol", "event"],
        )?;
        let monitor_cycle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "monitor_cycle_duration_seconds",
                "Wall-clock duration of one monitoring cycle",
            )
            .namespace(METRICS_NAMESPACE),
        )?;

        registry.register(Box::new(health_factor.clone()))?;
        registry.register(Box::new(utilization_rate.clone()))?;
        registry.register(Box::new(total_deposits.clone()))?;
        registry.register(Box::new(total_borrows.clone()))?;
        registry.register(Box::new(supply_rate_apr.clone()))?;
        registry.register(Box::new(borrow_rate_apr.clone()))?;
        registry.register(Box::new(oracle_price_usd.clone()))?;
        registry.register(Box::new(oracle_staleness_seconds.clone()))?;
        registry.register(Box::new(liquidation_events_total.clone()))?;
        registry.register(Box::new(events_total.clone()))?;
        registry.register(Box::new(monitor_cycle_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            health_factor,
            utilization_rate,
            total_deposits,
            total_borrows,
            supply_rate_apr,
            borrow_rate_apr,
            oracle_price_usd,
            oracle_staleness_seconds,
            liquidation_events_total,
            events_total,
            monitor_cycle_duration_seconds,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every registered instrument.
    pub fn render(&self) -> Result<String, MonitorError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| MonitorError::decode("metrics encoding", e))
    }
}

impl MetricsSink for PrometheusMetrics {
    fn set_health_factor(&self, protocol: &str, user: &str, value: f64) {
        self.health_factor.with_label_values(&[protocol, user]).set(value);
    }

    fn set_reserve(&self, protocol: &str, asset: &str, snapshot: &ReserveSnapshot) {
        let labels = [protocol, asset];
        self.utilization_rate.with_label_values(&labels).set(to_f64(snapshot.utilization));
        self.total_deposits.with_label_values(&labels).set(to_f64(snapshot.total_deposits));
        self.total_borrows.with_label_values(&labels).set(to_f64(snapshot.total_borrows));
        self.supply_rate_apr.with_label_values(&labels).set(to_f64(snapshot.supply_rate_apr));
        self.borrow_rate_apr.with_label_values(&labels).set(to_f64(snapshot.borrow_rate_apr));
        self.oracle_price_usd.with_label_values(&[asset]).set(to_f64(snapshot.price_usd));
    }

    fn set_oracle_staleness(&self, feed: &str, seconds: f64) {
        self.oracle_staleness_seconds.with_label_values(&[feed]).set(seconds);
    }

    fn inc_liquidation_events(&self, protocol: &str) {
        self.liquidation_events_total.with_label_values(&[protocol]).inc();
    }

    fn inc_indexed_events(&self, protocol: &str, event: &str) {
        self.events_total.with_label_values(&[protocol, event]).inc();
    }

    fn observe_cycle_duration(&self, seconds: f64) {
        self.monitor_cycle_duration_seconds.observe(seconds);
    }
}

// ---------------------------------------------------------------------------
// HTTP exposition
// ---------------------------------------------------------------------------

/// GET /metrics
async fn metrics_handler(State(metrics): State<Arc<PrometheusMetrics>>) -> impl IntoResponse {
    match metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "text/plain; version=0.0.4")],
                String::new(),
            )
        }
    }
}

/// GET /health
async fn health_handler() -> &'static str {
    "ok"
}

pub fn metrics_router(metrics: Arc<PrometheusMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(metrics)
}

/// Serve `/metrics` and `/health` until `shutdown` is cancelled.
pub async fn serve_metrics(
    addr: SocketAddr,
    metrics: Arc<PrometheusMetrics>,
    shutdown: CancellationToken,
) -> Result<(), MonitorError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "metrics server listening");

    axum::serve(listener, metrics_router(metrics))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("metrics server stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Test sink
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory sink that remembers the last value per label set.
    #[derive(Default)]
    pub struct RecordingMetrics {
        pub health_factors: Mutex<HashMap<String, f64>>,
        pub reserves: Mutex<HashMap<String, ReserveSnapshot>>,
        pub staleness: Mutex<HashMap<String, f64>>,
        pub liquidations: Mutex<u64>,
        pub events: Mutex<HashMap<String, u64>>,
        pub cycle_durations: Mutex<Vec<f64>>,
    }

    impl RecordingMetrics {
        pub fn health_factor(&self, user: &str) -> Option<f64> {
            self.health_factors.lock().unwrap().get(user).copied()
        }

        pub fn cycles_observed(&self) -> usize {
            self.cycle_durations.lock().unwrap().len()
        }

        pub fn event_count(&self, event: &str) -> u64 {
            self.events.lock().unwrap().get(event).copied().unwrap_or(0)
        }
    }

    impl MetricsSink for RecordingMetrics {
        fn set_health_factor(&self, _protocol: &str, user: &str, value: f64) {
            self.health_factors.lock().unwrap().insert(user.to_string(), value);
        }

        fn set_reserve(&self, _protocol: &str, asset: &str, snapshot: &ReserveSnapshot) {
            self.reserves.lock().unwrap().insert(asset.to_string(), snapshot.clone());
        }

        fn set_oracle_staleness(&self, feed: &str, seconds: f64) {
            self.staleness.lock().unwrap().insert(feed.to_string(), seconds);
        }

        fn inc_liquidation_events(&self, _protocol: &str) {
            *self.liquidations.lock().unwrap() += 1;
        }

        fn inc_indexed_events(&self, _protocol: &str, event: &str) {
            *self.events.lock().unwrap().entry(event.to_string()).or_default() += 1;
        }

        fn observe_cycle_duration(&self, seconds: f64) {
            self.cycle_durations.lock().unwrap().push(seconds);
        }
    }
}
