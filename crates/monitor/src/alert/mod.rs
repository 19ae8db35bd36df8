//! Alert dispatch: decides whether an observation warrants an alert and
//! builds the payload. Delivery lives behind [`AlertSink`].
//!
//! The decision functions are pure: same input, same alert (modulo
//! timestamp). Nothing here remembers what was sent before, so an account
//! sitting below a threshold re-alerts on every tick.

pub mod retry;
pub mod webhook;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::errors::DeliveryError;
use crate::types::{Alert, AlertLevel, HealthClassification, OracleFeedStatus, UtilizationStatus, Wad};

pub use retry::{deliver_with_policy, RetryPolicy};
pub use webhook::WebhookAlerter;

pub const TITLE_LOW_HEALTH_FACTOR: &str = "Low Health Factor Detected";
pub const TITLE_ORACLE_STALENESS: &str = "Oracle Staleness Detected";
pub const TITLE_HIGH_UTILIZATION: &str = "High Utilization Detected";

/// Destination for built alerts. One call = one delivery attempt.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: &Alert) -> Result<(), DeliveryError>;
}

/// Build a health factor alert, or `None` when the position is healthy.
///
/// Severity comes from [`HealthClassification::from_health_factor`], the same
/// rule the evaluator uses.
pub fn for_health_factor(user: &str, health_factor: Wad) -> Option<Alert> {
    let class = HealthClassification::from_health_factor(health_factor);
    if class.is_healthy() {
        return None;
    }

    let hf = health_factor.to_decimal();
    Some(
        Alert::new(
            AlertLevel::from(class),
            TITLE_LOW_HEALTH_FACTOR,
            format!("User {user} health factor: {hf:.4}"),
        )
        .with_metadata("user", user)
        .with_metadata("health_factor", format!("{hf:.6}")),
    )
}

/// Build an oracle staleness alert, or `None` while `staleness < max_staleness`.
pub fn for_oracle_staleness(feed: &str, staleness: Duration, max_staleness: Duration) -> Option<Alert> {
    let class = OracleFeedStatus::classify(staleness, max_staleness);
    if class.is_healthy() {
        return None;
    }

    let age = staleness.as_secs();
    let max = max_staleness.as_secs();
    Some(
        Alert::new(
            AlertLevel::from(class),
            TITLE_ORACLE_STALENESS,
            format!("Feed {feed} stale: {age}s (max: {max}s)"),
        )
        .with_metadata("feed", feed)
        .with_metadata("staleness", format!("{age}s"))
        .with_metadata("max_staleness", format!("{max}s")),
    )
}

/// Build a utilization alert, or `None` below 90%.
pub fn for_utilization(asset: &str, utilization: Decimal) -> Option<Alert> {
    let class = UtilizationStatus::classify(utilization);
    if class.is_healthy() {
        return None;
    }

    let percent = utilization * dec!(100);
    Some(
        Alert::new(
            AlertLevel::from(class),
            TITLE_HIGH_UTILIZATION,
            format!("Asset {asset} utilization: {percent:.2}%"),
        )
        .with_metadata("asset", asset)
        .with_metadata("utilization", format!("{utilization:.4}")),
    )
}
