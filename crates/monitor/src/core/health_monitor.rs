//! Account health evaluation and the periodic monitoring cycle.
//!
//! One cycle walks every monitored account, then every configured reserve and
//! oracle feed. Each item is fetched, classified, exported to metrics and, if
//! not healthy, turned into an alert. A failure on one item is logged and the
//! cycle moves on.
//!
//! Key properties:
//! - Classification compares WAD integers, never floats
//! - Debt-free accounts are skipped, not reported healthy
//! - No alert memory across cycles: a position below threshold re-alerts every tick
//! - Cooperative cancellation, checked before each tick and each item

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::Address;
use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::alert::{self, deliver_with_policy, AlertSink, RetryPolicy};
use crate::config::MonitorConfig;
use crate::constants::PROTOCOL_LABEL;
use crate::errors::MonitorError;
use crate::metrics::MetricsSink;
use crate::types::wad_ray::to_f64;
use crate::types::{AccountPosition, Alert, HealthClassification, ReserveSnapshot};

// ---------------------------------------------------------------------------
// Data sources
// ---------------------------------------------------------------------------

/// Per-account position reads. One call per account, no batching.
#[async_trait]
pub trait AccountDataSource: Send + Sync {
    async fn account_position(&self, user: Address) -> Result<AccountPosition, MonitorError>;
}

/// Reserve and price-feed reads.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn reserve_snapshot(&self, asset: Address) -> Result<ReserveSnapshot, MonitorError>;

    /// Unix timestamp (seconds) of the feed's latest round.
    async fn feed_updated_at(&self, feed: Address) -> Result<u64, MonitorError>;
}

// ---------------------------------------------------------------------------
// Pure evaluation
// ---------------------------------------------------------------------------

/// Classify a position, or `None` when it carries no debt.
pub fn evaluate(position: &AccountPosition) -> Option<HealthClassification> {
    position
        .has_debt()
        .then(|| HealthClassification::from_health_factor(position.health_factor))
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReserveTarget {
    pub symbol: String,
    pub address: Address,
}

#[derive(Debug, Clone)]
pub struct FeedTarget {
    pub name: String,
    pub address: Address,
    pub max_staleness: Duration,
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub accounts: Vec<Address>,
    pub reserves: Vec<ReserveTarget>,
    pub feeds: Vec<FeedTarget>,
    pub interval: Duration,
    pub retry: RetryPolicy,
    pub protocol: String,
}

impl MonitorSettings {
    pub fn from_config(config: &MonitorConfig) -> Result<Self, MonitorError> {
        let parse = |field: &str, value: &str| -> Result<Address, MonitorError> {
            value
                .parse()
                .map_err(|e| MonitorError::Config(format!("{field}: invalid address '{value}': {e}")))
        };

        let accounts = config
            .accounts
            .addresses
            .iter()
            .map(|a| parse("accounts.addresses", a))
            .collect::<Result<Vec<_>, _>>()?;

        let reserves = config
            .markets
            .reserves
            .iter()
            .map(|r| {
                Ok(ReserveTarget {
                    symbol: r.symbol.clone(),
                    address: parse("markets.reserves", &r.address)?,
                })
            })
            .collect::<Result<Vec<_>, MonitorError>>()?;

        let feeds = config
            .markets
            .oracle_feeds
            .iter()
            .map(|f| {
                Ok(FeedTarget {
                    name: f.name.clone(),
                    address: parse("markets.oracle_feeds", &f.address)?,
                    max_staleness: Duration::from_secs(f.max_staleness_seconds),
                })
            })
            .collect::<Result<Vec<_>, MonitorError>>()?;

        let retry = &config.alerting.retry;
        Ok(Self {
            accounts,
            reserves,
            feeds,
            interval: Duration::from_secs(config.timing.interval_seconds),
            retry: RetryPolicy::new(retry.max_attempts, Duration::from_millis(retry.backoff_ms)),
            protocol: PROTOCOL_LABEL.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Cycle state and report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Between ticks.
    Idle,
    /// A cycle is in progress.
    Running,
    /// Cancelled. Terminal.
    Stopped,
}

/// Outcome counts of one monitoring cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Accounts whose position was fetched.
    pub accounts_checked: usize,
    pub accounts_failed: usize,
    pub accounts_without_debt: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    pub reserves_checked: usize,
    pub reserves_failed: usize,
    pub feeds_checked: usize,
    pub feeds_failed: usize,
    /// The cycle stopped early on cancellation.
    pub cancelled: bool,
}

// ---------------------------------------------------------------------------
// HealthMonitor
// ---------------------------------------------------------------------------

pub struct HealthMonitor {
    accounts: Arc<dyn AccountDataSource>,
    market: Arc<dyn MarketDataSource>,
    alerter: Option<Arc<dyn AlertSink>>,
    metrics: Arc<dyn MetricsSink>,
    settings: MonitorSettings,
    shutdown: CancellationToken,
    state: std::sync::Mutex<MonitorState>,
}

impl HealthMonitor {
    pub fn new(
        accounts: Arc<dyn AccountDataSource>,
        market: Arc<dyn MarketDataSource>,
        alerter: Option<Arc<dyn AlertSink>>,
        metrics: Arc<dyn MetricsSink>,
        settings: MonitorSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            accounts,
            market,
            alerter,
            metrics,
            settings,
            shutdown,
            state: std::sync::Mutex::new(MonitorState::Idle),
        }
    }

    pub fn state(&self) -> MonitorState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: MonitorState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
    }

    /// Tick loop. The first cycle runs immediately; later ticks that fall
    /// behind are delayed rather than bursted. Runs until cancelled.
    pub async fn run(&self) -> Result<(), MonitorError> {
        info!(
            accounts = self.settings.accounts.len(),
            reserves = self.settings.reserves.len(),
            feeds = self.settings.feeds.len(),
            interval_secs = self.settings.interval.as_secs(),
            alerting = self.alerter.is_some(),
            "health monitor started"
        );

        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    info!("health monitor shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.run_cycle().await;
                    if report.cancelled {
                        info!("health monitor shutting down mid-cycle");
                        break;
                    }
                }
            }
        }

        self.set_state(MonitorState::Stopped);
        Ok(())
    }

    /// One full pass over accounts, reserves and feeds.
    pub async fn run_cycle(&self) -> CycleReport {
        self.set_state(MonitorState::Running);
        let started = Instant::now();
        let mut report = CycleReport::default();

        'cycle: {
            for &user in &self.settings.accounts {
                if self.shutdown.is_cancelled() {
                    report.cancelled = true;
                    break 'cycle;
                }
                self.check_account(user, &mut report).await;
            }

            for reserve in &self.settings.reserves {
                if self.shutdown.is_cancelled() {
                    report.cancelled = true;
                    break 'cycle;
                }
                self.check_reserve(reserve, &mut report).await;
            }

            for feed in &self.settings.feeds {
                if self.shutdown.is_cancelled() {
                    report.cancelled = true;
                    break 'cycle;
                }
                self.check_feed(feed, &mut report).await;
            }
        }

        let elapsed = started.elapsed();
        self.metrics.observe_cycle_duration(elapsed.as_secs_f64());

        info!(
            duration_ms = elapsed.as_millis() as u64,
            accounts_checked = report.accounts_checked,
            accounts_failed = report.accounts_failed,
            accounts_without_debt = report.accounts_without_debt,
            reserves_checked = report.reserves_checked,
            feeds_checked = report.feeds_checked,
            alerts_sent = report.alerts_sent,
            alerts_failed = report.alerts_failed,
            cancelled = report.cancelled,
            "monitoring cycle complete"
        );

        self.set_state(MonitorState::Idle);
        report
    }

    async fn check_account(&self, user: Address, report: &mut CycleReport) {
        let position = match self.accounts.account_position(user).await {
            Ok(p) => p,
            Err(e) => {
                report.accounts_failed += 1;
                error!(address = %user, error = %e, "failed to fetch account data");
                return;
            }
        };
        report.accounts_checked += 1;

        let Some(class) = evaluate(&position) else {
            report.accounts_without_debt += 1;
            debug!(address = %user, "account has no debt, skipping");
            return;
        };

        let user_label = user.to_string();
        let hf = position.health_factor;
        self.metrics
            .set_health_factor(&self.settings.protocol, &user_label, to_f64(hf.to_decimal()));

        match class {
            HealthClassification::Healthy => debug!(address = %user, hf = %hf, "account healthy"),
            HealthClassification::Warning => warn!(address = %user, hf = %hf, "health factor warning"),
            HealthClassification::Critical => error!(address = %user, hf = %hf, "health factor critical"),
        }

        if let Some(alert) = alert::for_health_factor(&user_label, hf) {
            self.dispatch(alert, report).await;
        }
    }

    async fn check_reserve(&self, reserve: &ReserveTarget, report: &mut CycleReport) {
        let snapshot = match self.market.reserve_snapshot(reserve.address).await {
            Ok(s) => s,
            Err(e) => {
                report.reserves_failed += 1;
                error!(asset = %reserve.symbol, error = %e, "failed to fetch reserve data");
                return;
            }
        };
        report.reserves_checked += 1;

        self.metrics
            .set_reserve(&self.settings.protocol, &reserve.symbol, &snapshot);
        debug!(
            asset = %reserve.symbol,
            utilization = %snapshot.utilization,
            borrow_apr = %snapshot.borrow_rate_apr,
            price_usd = %snapshot.price_usd,
            "reserve data"
        );

        if let Some(alert) = alert::for_utilization(&reserve.symbol, snapshot.utilization) {
            warn!(asset = %reserve.symbol, utilization = %snapshot.utilization, "high utilization");
            self.dispatch(alert, report).await;
        }
    }

    async fn check_feed(&self, feed: &FeedTarget, report: &mut CycleReport) {
        let updated_at = match self.market.feed_updated_at(feed.address).await {
            Ok(ts) => ts,
            Err(e) => {
                report.feeds_failed += 1;
                error!(feed = %feed.name, error = %e, "failed to fetch oracle round");
                return;
            }
        };
        report.feeds_checked += 1;

        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
        let staleness = Duration::from_secs(now.saturating_sub(updated_at));
        self.metrics
            .set_oracle_staleness(&feed.name, staleness.as_secs_f64());

        if let Some(alert) = alert::for_oracle_staleness(&feed.name, staleness, feed.max_staleness) {
            warn!(
                feed = %feed.name,
                staleness_secs = staleness.as_secs(),
                max_secs = feed.max_staleness.as_secs(),
                "oracle feed stale"
            );
            self.dispatch(alert, report).await;
        }
    }

    /// Deliver through the sink if one is configured. Failures are counted
    /// and logged, never propagated.
    async fn dispatch(&self, alert: Alert, report: &mut CycleReport) {
        let Some(sink) = &self.alerter else {
            return;
        };

        match deliver_with_policy(sink.as_ref(), &alert, &self.settings.retry, &self.shutdown).await {
            Ok(()) => report.alerts_sent += 1,
            Err(e) => {
                report.alerts_failed += 1;
                error!(title = %alert.title, level = alert.level.as_str(), error = %e, "failed to send alert");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DeliveryError;
    use crate::metrics::testing::RecordingMetrics;
    use crate::types::{AlertLevel, Wad};
    use alloy::primitives::{address, U256};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const ALICE: Address = address!("1111111111111111111111111111111111111111");
    const BOB: Address = address!("2222222222222222222222222222222222222222");
    const CAROL: Address = address!("3333333333333333333333333333333333333333");
    const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
    const ETH_USD: Address = address!("5f4eC3Df9cbd43714FE2740f5E3616155c5b8419");

    // -----------------------------------------------------------------------
    // Fakes
    // -----------------------------------------------------------------------

    fn position(user: Address, debt: u64, hf_raw: u128) -> AccountPosition {
        AccountPosition {
            user,
            total_collateral: U256::from(10_000u64),
            total_debt: U256::from(debt),
            health_factor: Wad::from_raw(U256::from(hf_raw)),
        }
    }

    #[derive(Default)]
    struct FakeAccounts {
        /// Missing entry = fetch failure.
        positions: HashMap<Address, AccountPosition>,
        fetched: Mutex<Vec<Address>>,
        /// Cancel this token when the given account is fetched.
        cancel_on: Option<(Address, CancellationToken)>,
    }

    #[async_trait]
    impl AccountDataSource for FakeAccounts {
        async fn account_position(&self, user: Address) -> Result<AccountPosition, MonitorError> {
            self.fetched.lock().unwrap().push(user);
            if let Some((trigger, token)) = &self.cancel_on {
                if *trigger == user {
                    token.cancel();
                }
            }
            self.positions
                .get(&user)
                .cloned()
                .ok_or_else(|| MonitorError::transport("getUserAccountData", "connection reset"))
        }
    }

    #[derive(Default)]
    struct FakeMarket {
        reserves: HashMap<Address, ReserveSnapshot>,
        feeds: HashMap<Address, u64>,
    }

    #[async_trait]
    impl MarketDataSource for FakeMarket {
        async fn reserve_snapshot(&self, asset: Address) -> Result<ReserveSnapshot, MonitorError> {
            self.reserves
                .get(&asset)
                .cloned()
                .ok_or_else(|| MonitorError::decode("getReserveData", "execution reverted"))
        }

        async fn feed_updated_at(&self, feed: Address) -> Result<u64, MonitorError> {
            self.feeds
                .get(&feed)
                .copied()
                .ok_or_else(|| MonitorError::transport("latestRoundData", "timeout"))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        fail: bool,
        alerts: Mutex<Vec<Alert>>,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn deliver(&self, alert: &Alert) -> Result<(), DeliveryError> {
            self.alerts.lock().unwrap().push(alert.clone());
            if self.fail {
                Err(DeliveryError::Rejected { status: 500 })
            } else {
                Ok(())
            }
        }
    }

    impl RecordingSink {
        fn levels(&self) -> Vec<AlertLevel> {
            self.alerts.lock().unwrap().iter().map(|a| a.level).collect()
        }
    }

    fn assert_gauge(actual: Option<f64>, expected: f64) {
        let value = actual.expect("gauge not set");
        assert!((value - expected).abs() < 1e-9, "gauge {value} != {expected}");
    }

    fn settings(accounts: Vec<Address>) -> MonitorSettings {
        MonitorSettings {
            accounts,
            reserves: vec![],
            feeds: vec![],
            interval: Duration::from_secs(3600),
            retry: RetryPolicy::none(),
            protocol: PROTOCOL_LABEL.to_string(),
        }
    }

    struct Harness {
        monitor: Arc<HealthMonitor>,
        sink: Arc<RecordingSink>,
        metrics: Arc<RecordingMetrics>,
        accounts: Arc<FakeAccounts>,
        shutdown: CancellationToken,
    }

    fn harness_with(
        accounts: FakeAccounts,
        market: FakeMarket,
        sink: RecordingSink,
        settings: MonitorSettings,
        shutdown: CancellationToken,
    ) -> Harness {
        let accounts = Arc::new(accounts);
        let sink = Arc::new(sink);
        let metrics = Arc::new(RecordingMetrics::default());
        let monitor = Arc::new(HealthMonitor::new(
            Arc::clone(&accounts) as Arc<dyn AccountDataSource>,
            Arc::new(market),
            Some(Arc::clone(&sink) as Arc<dyn AlertSink>),
            Arc::clone(&metrics) as Arc<dyn MetricsSink>,
            settings,
            shutdown.clone(),
        ));
        Harness { monitor, sink, metrics, accounts, shutdown }
    }

    fn harness(positions: Vec<AccountPosition>, users: Vec<Address>) -> Harness {
        let accounts = FakeAccounts {
            positions: positions.into_iter().map(|p| (p.user, p)).collect(),
            ..Default::default()
        };
        harness_with(
            accounts,
            FakeMarket::default(),
            RecordingSink::default(),
            settings(users),
            CancellationToken::new(),
        )
    }

    // -----------------------------------------------------------------------
    // evaluate
    // -----------------------------------------------------------------------

    #[test]
    fn test_evaluate_zero_debt_is_none() {
        assert_eq!(evaluate(&position(ALICE, 0, 500_000_000_000_000_000)), None);
        assert_eq!(evaluate(&position(ALICE, 0, 0)), None);
    }

    #[test]
    fn test_evaluate_boundaries() {
        assert_eq!(
            evaluate(&position(ALICE, 1, 1_000_000_000_000_000_000)),
            Some(HealthClassification::Warning)
        );
        assert_eq!(
            evaluate(&position(ALICE, 1, 1_200_000_000_000_000_000)),
            Some(HealthClassification::Healthy)
        );
        assert_eq!(
            evaluate(&position(ALICE, 1, 999_999_999_999_999_999)),
            Some(HealthClassification::Critical)
        );
    }

    proptest! {
        #[test]
        fn evaluate_matches_thresholds(debt in 0u64..1_000, hf_raw in 0u128..3_000_000_000_000_000_000u128) {
            let result = evaluate(&position(ALICE, debt, hf_raw));
            if debt == 0 {
                prop_assert_eq!(result, None);
            } else if hf_raw < 1_000_000_000_000_000_000 {
                prop_assert_eq!(result, Some(HealthClassification::Critical));
            } else if hf_raw < 1_200_000_000_000_000_000 {
                prop_assert_eq!(result, Some(HealthClassification::Warning));
            } else {
                prop_assert_eq!(result, Some(HealthClassification::Healthy));
            }
        }
    }

    // -----------------------------------------------------------------------
    // run_cycle scenarios
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_warning_scenario() {
        let h = harness(vec![position(ALICE, 500, 1_050_000_000_000_000_000)], vec![ALICE]);
        let report = h.monitor.run_cycle().await;

        assert_eq!(report.alerts_sent, 1);
        let alerts = h.sink.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        let json = serde_json::to_value(&alerts[0]).unwrap();
        assert_eq!(json["level"], "WARNING");
        assert_gauge(h.metrics.health_factor(&ALICE.to_string()), 1.05);
    }

    #[tokio::test]
    async fn test_critical_scenario() {
        let h = harness(vec![position(ALICE, 500, 950_000_000_000_000_000)], vec![ALICE]);
        h.monitor.run_cycle().await;
        assert_eq!(h.sink.levels(), vec![AlertLevel::Critical]);
    }

    #[tokio::test]
    async fn test_zero_debt_no_alert_no_gauge() {
        let h = harness(vec![position(ALICE, 0, 900_000_000_000_000_000)], vec![ALICE]);
        let report = h.monitor.run_cycle().await;

        assert_eq!(report.accounts_checked, 1);
        assert_eq!(report.accounts_without_debt, 1);
        assert!(h.sink.alerts.lock().unwrap().is_empty());
        assert_eq!(h.metrics.health_factor(&ALICE.to_string()), None);
    }

    #[tokio::test]
    async fn test_healthy_account_updates_gauge_only() {
        let h = harness(vec![position(ALICE, 500, 2_000_000_000_000_000_000)], vec![ALICE]);
        h.monitor.run_cycle().await;
        assert!(h.sink.alerts.lock().unwrap().is_empty());
        assert_gauge(h.metrics.health_factor(&ALICE.to_string()), 2.0);
    }

    #[tokio::test]
    async fn test_one_failing_account_is_isolated() {
        // BOB has no entry, so his fetch fails.
        let h = harness(
            vec![
                position(ALICE, 500, 1_050_000_000_000_000_000),
                position(CAROL, 500, 950_000_000_000_000_000),
            ],
            vec![ALICE, BOB, CAROL],
        );
        let report = h.monitor.run_cycle().await;

        assert_eq!(report.accounts_checked, 2);
        assert_eq!(report.accounts_failed, 1);
        assert_eq!(h.sink.levels(), vec![AlertLevel::Warning, AlertLevel::Critical]);
        assert_eq!(h.metrics.cycles_observed(), 1);
    }

    #[tokio::test]
    async fn test_no_dedup_across_cycles() {
        let h = harness(vec![position(ALICE, 500, 1_050_000_000_000_000_000)], vec![ALICE]);
        h.monitor.run_cycle().await;
        h.monitor.run_cycle().await;
        assert_eq!(h.sink.levels(), vec![AlertLevel::Warning, AlertLevel::Warning]);
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_halt_cycle() {
        let accounts = FakeAccounts {
            positions: [
                position(ALICE, 500, 950_000_000_000_000_000),
                position(BOB, 500, 1_100_000_000_000_000_000),
            ]
            .into_iter()
            .map(|p| (p.user, p))
            .collect(),
            ..Default::default()
        };
        let sink = RecordingSink { fail: true, ..Default::default() };
        let h = harness_with(accounts, FakeMarket::default(), sink, settings(vec![ALICE, BOB]), CancellationToken::new());

        let report = h.monitor.run_cycle().await;
        assert_eq!(report.accounts_checked, 2);
        assert_eq!(report.alerts_failed, 2);
        assert_eq!(report.alerts_sent, 0);
    }

    #[tokio::test]
    async fn test_without_sink_still_evaluates() {
        let accounts: Arc<dyn AccountDataSource> = Arc::new(FakeAccounts {
            positions: [(ALICE, position(ALICE, 500, 950_000_000_000_000_000))].into(),
            ..Default::default()
        });
        let metrics = Arc::new(RecordingMetrics::default());
        let monitor = HealthMonitor::new(
            accounts,
            Arc::new(FakeMarket::default()),
            None,
            Arc::clone(&metrics) as Arc<dyn MetricsSink>,
            settings(vec![ALICE]),
            CancellationToken::new(),
        );

        let report = monitor.run_cycle().await;
        assert_eq!(report.alerts_sent + report.alerts_failed, 0);
        assert_gauge(metrics.health_factor(&ALICE.to_string()), 0.95);
    }

    #[tokio::test]
    async fn test_reserve_and_feed_checks() {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap();
        let market = FakeMarket {
            reserves: [(
                USDC,
                ReserveSnapshot {
                    total_deposits: dec!(1000),
                    total_borrows: dec!(920),
                    utilization: dec!(0.92),
                    supply_rate_apr: dec!(3),
                    borrow_rate_apr: dec!(5),
                    price_usd: dec!(1),
                },
            )]
            .into(),
            feeds: [(ETH_USD, now - 90 * 60)].into(),
        };
        let mut s = settings(vec![]);
        s.reserves = vec![
            ReserveTarget { symbol: "USDC".into(), address: USDC },
            // No snapshot for this one: fetch fails, cycle continues.
            ReserveTarget { symbol: "WETH".into(), address: ALICE },
        ];
        s.feeds = vec![FeedTarget {
            name: "ETH/USD".into(),
            address: ETH_USD,
            max_staleness: Duration::from_secs(3600),
        }];
        let h = harness_with(FakeAccounts::default(), market, RecordingSink::default(), s, CancellationToken::new());

        let report = h.monitor.run_cycle().await;
        assert_eq!(report.reserves_checked, 1);
        assert_eq!(report.reserves_failed, 1);
        assert_eq!(report.feeds_checked, 1);
        assert_eq!(h.sink.levels(), vec![AlertLevel::Warning, AlertLevel::Warning]);

        assert!(h.metrics.reserves.lock().unwrap().contains_key("USDC"));
        let staleness = h.metrics.staleness.lock().unwrap()["ETH/USD"];
        assert!((5400.0..5460.0).contains(&staleness), "staleness {staleness}");
    }

    // -----------------------------------------------------------------------
    // Cancellation and state
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_cancellation_mid_cycle() {
        let shutdown = CancellationToken::new();
        let accounts = FakeAccounts {
            positions: [ALICE, BOB, CAROL]
                .into_iter()
                .map(|u| (u, position(u, 500, 950_000_000_000_000_000)))
                .collect(),
            cancel_on: Some((BOB, shutdown.clone())),
            ..Default::default()
        };
        let h = harness_with(accounts, FakeMarket::default(), RecordingSink::default(), settings(vec![ALICE, BOB, CAROL]), shutdown);

        let report = h.monitor.run_cycle().await;
        assert!(report.cancelled);
        // BOB's evaluation finishes; CAROL is never started.
        assert_eq!(*h.accounts.fetched.lock().unwrap(), vec![ALICE, BOB]);
        assert_eq!(report.accounts_checked, 2);
        assert_eq!(h.metrics.cycles_observed(), 1);
    }

    #[tokio::test]
    async fn test_run_precancelled_stops_without_cycle() {
        let h = harness(vec![position(ALICE, 500, 950_000_000_000_000_000)], vec![ALICE]);
        h.shutdown.cancel();

        h.monitor.run().await.unwrap();
        assert_eq!(h.monitor.state(), MonitorState::Stopped);
        assert_eq!(h.metrics.cycles_observed(), 0);
        assert!(h.accounts.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_first_cycle_immediate_then_stops() {
        let h = harness(vec![position(ALICE, 500, 1_050_000_000_000_000_000)], vec![ALICE]);
        assert_eq!(h.monitor.state(), MonitorState::Idle);

        let monitor = Arc::clone(&h.monitor);
        let task = tokio::spawn(async move { monitor.run().await });

        tokio::time::timeout(Duration::from_secs(5), async {
            while h.metrics.cycles_observed() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("first cycle did not run");

        h.shutdown.cancel();
        task.await.unwrap().unwrap();
        assert_eq!(h.monitor.state(), MonitorState::Stopped);
        // Interval is an hour: exactly one cycle ran.
        assert_eq!(h.metrics.cycles_observed(), 1);
        assert_eq!(h.sink.levels(), vec![AlertLevel::Warning]);
    }
}
