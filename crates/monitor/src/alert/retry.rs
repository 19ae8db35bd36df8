//! Caller-side delivery retry policy.
//!
//! Sinks never retry on their own. The default policy is a single attempt;
//! anything else is an explicit, configured choice.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::errors::DeliveryError;
use crate::types::Alert;

use super::AlertSink;

/// Backoff multiplier cap: attempt N waits `backoff * min(N, 6)`.
const MAX_BACKOFF_STEPS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Always >= 1.
    pub max_attempts: u32,
    /// Base delay between attempts, grown linearly.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retry.
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt.min(MAX_BACKOFF_STEPS))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Deliver `alert` through `sink`, retrying per `policy`.
///
/// Waiting between attempts is abandoned on cancellation; the last error is
/// returned in that case.
pub async fn deliver_with_policy(
    sink: &dyn AlertSink,
    alert: &Alert,
    policy: &RetryPolicy,
    shutdown: &CancellationToken,
) -> Result<(), DeliveryError> {
    let mut attempt = 1u32;
    loop {
        match sink.deliver(alert).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= policy.max_attempts => return Err(e),
            Err(e) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    error = %e,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "alert delivery failed, retrying"
                );
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = shutdown.cancelled() => return Err(e),
                }
                attempt += 1;
            }
        }
    }
}
