pub mod types;
pub mod validate;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Load `app.json` and `monitor.json` into a single [`MonitorConfig`], then
/// apply environment variable overrides and validate.
///
/// Expected directory layout:
/// ```text
/// config/
///   app.json
///   monitor.json
/// ```
///
/// # Environment variable overrides
///
/// | Env Var                     | Config Field                 |
/// |-----------------------------|------------------------------|
/// | `ETH_RPC_URL`               | `chain.rpc_url`              |
/// | `MONITOR_ADDRESSES`         | `accounts.addresses` (comma-separated) |
/// | `MONITOR_INTERVAL_SECONDS`  | `timing.interval_seconds`    |
/// | `ALERT_WEBHOOK_URL`         | `alerting.webhook_url`       |
/// | `METRICS_LISTEN_ADDR`       | `metrics.listen_addr`        |
/// | `INDEXER_FROM_BLOCK`        | `indexer.from_block`         |
pub fn load_config(config_dir: &Path) -> Result<MonitorConfig> {
    let read = |name: &str| -> Result<String> {
        let path = config_dir.join(name);
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))
    };

    let app: AppConfig = serde_json::from_str(&read("app.json")?).context("parsing app.json")?;

    let monitor: MonitorFile =
        serde_json::from_str(&read("monitor.json")?).context("parsing monitor.json")?;

    let mut config = MonitorConfig {
        app,
        chain: monitor.chain,
        accounts: monitor.accounts,
        timing: monitor.timing,
        alerting: monitor.alerting,
        metrics: monitor.metrics,
        markets: monitor.markets,
        indexer: monitor.indexer,
    };

    apply_env_overrides(&mut config);
    validate::validate_config(&config)?;

    Ok(config)
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides to the loaded config.
///
/// Only non-empty env vars take effect. Parse failures are skipped (the JSON
/// value remains).
fn apply_env_overrides(config: &mut MonitorConfig) {
    if let Some(val) = env_string("ETH_RPC_URL") {
        info!("env override: ETH_RPC_URL");
        config.chain.rpc_url = val;
    }

    if let Some(val) = env_list("MONITOR_ADDRESSES") {
        info!(count = val.len(), "env override: MONITOR_ADDRESSES");
        config.accounts.addresses = val;
    }

    if let Some(val) = env_parse::<u64>("MONITOR_INTERVAL_SECONDS") {
        info!(val, "env override: MONITOR_INTERVAL_SECONDS");
        config.timing.interval_seconds = val;
    }

    if let Some(val) = env_string("ALERT_WEBHOOK_URL") {
        info!("env override: ALERT_WEBHOOK_URL");
        config.alerting.webhook_url = Some(val);
    }

    if let Some(val) = env_string("METRICS_LISTEN_ADDR") {
        info!(%val, "env override: METRICS_LISTEN_ADDR");
        config.metrics.listen_addr = val;
    }

    if let Some(val) = env_parse::<u64>("INDEXER_FROM_BLOCK") {
        info!(val, "env override: INDEXER_FROM_BLOCK");
        config.indexer.from_block = Some(val);
    }
}

/// Read a non-empty env var as a `String`.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Read a non-empty env var and parse it as `T`.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

/// Read a comma-separated env var, trimming entries and dropping empties.
fn env_list(key: &str) -> Option<Vec<String>> {
    let items: Vec<String> = env_string(key)?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    (!items.is_empty()).then_some(items)
}
