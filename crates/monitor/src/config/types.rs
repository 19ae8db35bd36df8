use serde::{Deserialize, Serialize};

use crate::constants::{
    AAVE_V3_DATA_PROVIDER, AAVE_V3_ORACLE, AAVE_V3_POOL, DEFAULT_INTERVAL_SECONDS, DEFAULT_METRICS_LISTEN_ADDR, DEFAULT_ORACLE_MAX_STALENESS_SECONDS,
    DEFAULT_RPC_TIMEOUT_SECONDS,
};

// ---------------------------------------------------------------------------
// Top-level merged config
// ---------------------------------------------------------------------------

/// Merged configuration from `app.json` and `monitor.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub app: AppConfig,
    pub chain: ChainConfig,
    pub accounts: AccountsConfig,
    pub timing: TimingConfig,
    pub alerting: AlertingConfig,
    pub metrics: MetricsConfig,
    pub markets: MarketsConfig,
    pub indexer: IndexerConfig,
}

/// Shape of `monitor.json` on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct MonitorFile {
    pub chain: ChainConfig,
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub alerting: AlertingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub markets: MarketsConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
}

// ---------------------------------------------------------------------------
// app.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
}

// ---------------------------------------------------------------------------
// monitor.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    #[serde(default)]
    pub contracts: ContractsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    pub pool: String,
    pub data_provider: String,
    pub oracle: String,
}

/// Ethereum mainnet deployment.
impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            pool: AAVE_V3_POOL.to_string(),
            data_provider: AAVE_V3_DATA_PROVIDER.to_string(),
            oracle: AAVE_V3_ORACLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountsConfig {
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default = "default_rpc_timeout_seconds")]
    pub rpc_timeout_seconds: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            rpc_timeout_seconds: DEFAULT_RPC_TIMEOUT_SECONDS,
        }
    }
}

/// Alert sink settings. No `webhook_url` means evaluation without dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertingConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketsConfig {
    #[serde(default)]
    pub reserves: Vec<ReserveConfig>,
    #[serde(default)]
    pub oracle_feeds: Vec<OracleFeedConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveConfig {
    pub symbol: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleFeedConfig {
    pub name: String,
    pub address: String,
    #[serde(default = "default_max_staleness_seconds")]
    pub max_staleness_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub from_block: Option<u64>,
}

fn default_interval_seconds() -> u64 {
    DEFAULT_INTERVAL_SECONDS
}

fn default_rpc_timeout_seconds() -> u64 {
    DEFAULT_RPC_TIMEOUT_SECONDS
}

fn default_max_attempts() -> u32 {
    1
}

fn default_listen_addr() -> String {
    DEFAULT_METRICS_LISTEN_ADDR.to_string()
}

fn default_max_staleness_seconds() -> u64 {
    DEFAULT_ORACLE_MAX_STALENESS_SECONDS
}
