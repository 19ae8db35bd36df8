//! Pool event indexer: historical backfill plus live subscription.
//!
//! Every log goes through [`classify`] and is counted. Liquidations are
//! logged at `warn!` and counted separately. Nothing is persisted.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::MonitorError;
use crate::metrics::MetricsSink;
use crate::types::{DomainEvent, RawLog};

use super::event_classifier::classify;

/// Supplier of Pool log records.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Most recent block number known to the node.
    async fn latest_block(&self) -> Result<u64, MonitorError>;

    /// Point-in-time query over `[from_block, to_block]`.
    async fn fetch_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<RawLog>, MonitorError>;

    /// Unbounded live feed. Fails when the transport cannot stream.
    async fn subscribe(&self) -> Result<BoxStream<'static, RawLog>, MonitorError>;
}

pub struct EventIndexer {
    source: Arc<dyn LogSource>,
    metrics: Arc<dyn MetricsSink>,
    protocol: String,
    from_block: Option<u64>,
    shutdown: CancellationToken,
}

impl EventIndexer {
    pub fn new(
        source: Arc<dyn LogSource>,
        metrics: Arc<dyn MetricsSink>,
        protocol: impl Into<String>,
        from_block: Option<u64>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            source,
            metrics,
            protocol: protocol.into(),
            from_block,
            shutdown,
        }
    }

    /// Backfill from the configured start block (if any), then follow the
    /// live feed until cancelled. A failed backfill is logged and skipped.
    pub async fn run(&self) -> Result<(), MonitorError> {
        if let Some(from_block) = self.from_block {
            match self.source.latest_block().await {
                Ok(latest) if latest >= from_block => {
                    if let Err(e) = self.backfill(from_block, latest).await {
                        error!(error = %e, from_block, to_block = latest, "event backfill failed");
                    }
                }
                Ok(latest) => {
                    warn!(from_block, latest, "backfill start block is ahead of chain head, skipping");
                }
                Err(e) => error!(error = %e, "failed to read latest block, skipping backfill"),
            }
        }

        self.run_live().await
    }

    /// Classify and record every log in `[from_block, to_block]`.
    pub async fn backfill(&self, from_block: u64, to_block: u64) -> Result<Vec<DomainEvent>, MonitorError> {
        info!(from_block, to_block, "backfilling pool events");

        let logs = self.source.fetch_logs(from_block, to_block).await?;
        let events: Vec<DomainEvent> = logs.iter().map(classify).collect();
        for event in &events {
            self.record(event);
        }

        info!(count = events.len(), from_block, to_block, "backfill complete");
        Ok(events)
    }

    /// Follow the live feed until cancellation or end of stream.
    ///
    /// Subscription failure degrades to "no live indexing" and returns `Ok`.
    pub async fn run_live(&self) -> Result<(), MonitorError> {
        if self.shutdown.is_cancelled() {
            return Ok(());
        }

        let mut stream = match self.source.subscribe().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(
                    error = %e,
                    "log subscription unavailable (use a ws:// or wss:// RPC endpoint for live events), live indexing disabled"
                );
                return Ok(());
            }
        };
        info!("subscribed to pool events");

        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    info!("event indexer shutdown requested");
                    return Ok(());
                }
                next = stream.next() => match next {
                    Some(log) => self.record(&classify(&log)),
                    None => {
                        warn!("pool event stream ended");
                        return Ok(());
                    }
                },
            }
        }
    }

    fn record(&self, event: &DomainEvent) {
        let kind = event.kind();
        let meta = event.meta();
        self.metrics.inc_indexed_events(&self.protocol, kind.as_str());

        match event {
            DomainEvent::LiquidationCall {
                collateral_asset,
                debt_asset,
                user,
                ..
            } => {
                self.metrics.inc_liquidation_events(&self.protocol);
                warn!(
                    block = meta.block_number,
                    tx = %meta.tx_hash,
                    user = %user,
                    collateral = %collateral_asset,
                    debt = %debt_asset,
                    "liquidation event"
                );
            }
            DomainEvent::Unknown { signature, .. } => {
                debug!(block = meta.block_number, tx = %meta.tx_hash, signature = ?signature, "unknown event");
            }
            _ => {
                debug!(block = meta.block_number, tx = %meta.tx_hash, event = kind.as_str(), "pool event");
            }
        }
    }
}
