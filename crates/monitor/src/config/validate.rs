use std::net::SocketAddr;

use crate::errors::MonitorError;

use super::types::MonitorConfig;

/// Validate invariants across the merged config that serde alone cannot enforce.
///
/// Every problem is collected before failing, so one run reports them all.
/// Called automatically by [`super::load_config`].
pub fn validate_config(config: &MonitorConfig) -> Result<(), MonitorError> {
    let mut errors: Vec<String> = Vec::new();

    validate_chain_config(config, &mut errors);
    validate_accounts_config(config, &mut errors);
    validate_timing_config(config, &mut errors);
    validate_alerting_config(config, &mut errors);
    validate_metrics_config(config, &mut errors);
    validate_markets_config(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(MonitorError::Config(format!(
            "validation failed ({} error{}):\n  - {}",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" },
            errors.join("\n  - ")
        )))
    }
}

fn validate_chain_config(config: &MonitorConfig, errors: &mut Vec<String>) {
    let chain = &config.chain;

    if chain.rpc_url.trim().is_empty() {
        errors.push("chain.rpc_url is empty (set ETH_RPC_URL)".into());
    }

    let contract_addrs = [
        ("pool", &chain.contracts.pool),
        ("data_provider", &chain.contracts.data_provider),
        ("oracle", &chain.contracts.oracle),
    ];
    for (name, addr) in &contract_addrs {
        if let Err(e) = validate_address(addr) {
            errors.push(format!("chain.contracts.{name}: {e}"));
        }
    }
}

fn validate_accounts_config(config: &MonitorConfig, errors: &mut Vec<String>) {
    let addresses = &config.accounts.addresses;

    if addresses.is_empty() {
        errors.push("accounts.addresses: at least one address is required (set MONITOR_ADDRESSES)".into());
    }
    for (i, addr) in addresses.iter().enumerate() {
        if let Err(e) = validate_address(addr) {
            errors.push(format!("accounts.addresses[{i}]: {e}"));
        }
    }
}

fn validate_timing_config(config: &MonitorConfig, errors: &mut Vec<String>) {
    if config.timing.interval_seconds == 0 {
        errors.push("timing.interval_seconds must be > 0".into());
    }
    if config.timing.rpc_timeout_seconds == 0 {
        errors.push("timing.rpc_timeout_seconds must be > 0".into());
    }
}

fn validate_alerting_config(config: &MonitorConfig, errors: &mut Vec<String>) {
    if let Some(url) = &config.alerting.webhook_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!("alerting.webhook_url '{url}' must be an http(s) URL"));
        }
    }
    if config.alerting.retry.max_attempts == 0 {
        errors.push("alerting.retry.max_attempts must be >= 1".into());
    }
}

fn validate_metrics_config(config: &MonitorConfig, errors: &mut Vec<String>) {
    let addr = &config.metrics.listen_addr;
    if addr.parse::<SocketAddr>().is_err() {
        errors.push(format!("metrics.listen_addr '{addr}' is not a valid socket address"));
    }
}

fn validate_markets_config(config: &MonitorConfig, errors: &mut Vec<String>) {
    for (i, reserve) in config.markets.reserves.iter().enumerate() {
        if reserve.symbol.is_empty() {
            errors.push(format!("markets.reserves[{i}]: symbol is empty"));
        }
        if let Err(e) = validate_address(&reserve.address) {
            errors.push(format!("markets.reserves[{i}] ({}): {e}", reserve.symbol));
        }
    }

    for (i, feed) in config.markets.oracle_feeds.iter().enumerate() {
        if feed.name.is_empty() {
            errors.push(format!("markets.oracle_feeds[{i}]: name is empty"));
        }
        if let Err(e) = validate_address(&feed.address) {
            errors.push(format!("markets.oracle_feeds[{i}] ({}): {e}", feed.name));
        }
        if feed.max_staleness_seconds == 0 {
            errors.push(format!(
                "markets.oracle_feeds[{i}] ({}): max_staleness_seconds must be > 0",
                feed.name
            ));
        }
    }
}

/// Basic Ethereum address format check (0x-prefixed, 40 hex chars).
fn validate_address(addr: &str) -> Result<(), String> {
    if addr.is_empty() {
        return Err("address is empty".into());
    }
    if !addr.starts_with("0x") && !addr.starts_with("0X") {
        return Err(format!("address '{addr}' must start with 0x"));
    }
    if addr.len() != 42 {
        return Err(format!(
            "address '{addr}' has length {} (expected 42)",
            addr.len()
        ));
    }
    if !addr[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("address '{addr}' contains non-hex characters"));
    }
    Ok(())
}
