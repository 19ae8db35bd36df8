//! Aave V3 position health monitor.
//!
//! Polls monitored accounts, reserves and oracle feeds on a fixed tick,
//! classifies what it reads, exports Prometheus metrics and posts webhook
//! alerts. A separate indexer classifies Pool events into typed lending
//! events.

pub mod alert;
pub mod config;
pub mod constants;
pub mod core;
pub mod errors;
pub mod execution;
pub mod logging;
pub mod metrics;
pub mod types;
