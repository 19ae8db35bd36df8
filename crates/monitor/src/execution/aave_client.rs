//! Aave V3 read client: account, reserve, price feed and log reads.
//!
//! Implements the three data-source traits on one shared alloy provider.
//! Every RPC is bounded by the configured timeout. Contract-call failures
//! map onto [`MonitorError::Transport`] (node unreachable, timed out) or
//! [`MonitorError::Decode`] (revert, malformed return data).

use std::future::IntoFuture;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::{Filter, Log};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use tracing::debug;

use crate::config::ContractsConfig;
use crate::core::event_classifier::event_signatures;
use crate::core::event_indexer::LogSource;
use crate::core::health_monitor::{AccountDataSource, MarketDataSource};
use crate::errors::MonitorError;
use crate::types::wad_ray::{price_to_decimal, scale, utilization_wad};
use crate::types::{AccountPosition, RawLog, Ray, ReserveSnapshot, Wad};

use super::contracts::{IAaveOracle, IAggregatorV3, IPool, IPoolDataProvider};

pub struct AaveClient {
    provider: DynProvider,
    pool: IPool::IPoolInstance<DynProvider>,
    data_provider: IPoolDataProvider::IPoolDataProviderInstance<DynProvider>,
    oracle: IAaveOracle::IAaveOracleInstance<DynProvider>,
    pool_address: Address,
    rpc_timeout: Duration,
}

impl AaveClient {
    /// Construct over a shared provider. Addresses are parsed here so a bad
    /// config surfaces as [`MonitorError::Config`] at startup.
    pub fn new(
        provider: DynProvider,
        contracts: &ContractsConfig,
        rpc_timeout: Duration,
    ) -> Result<Self, MonitorError> {
        let parse = |name: &str, value: &str| -> Result<Address, MonitorError> {
            value
                .parse()
                .map_err(|e| MonitorError::Config(format!("chain.contracts.{name}: {e}")))
        };
        let pool_address = parse("pool", &contracts.pool)?;
        let dp_address = parse("data_provider", &contracts.data_provider)?;
        let oracle_address = parse("oracle", &contracts.oracle)?;

        Ok(Self {
            pool: IPool::new(pool_address, provider.clone()),
            data_provider: IPoolDataProvider::new(dp_address, provider.clone()),
            oracle: IAaveOracle::new(oracle_address, provider.clone()),
            provider,
            pool_address,
            rpc_timeout,
        })
    }

    /// Run a contract call under the RPC timeout and classify its error.
    async fn contract_call<T, F>(&self, context: &str, call: F) -> Result<T, MonitorError>
    where
        F: IntoFuture<Output = Result<T, alloy::contract::Error>>,
    {
        match tokio::time::timeout(self.rpc_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(alloy::contract::Error::TransportError(e))) => Err(MonitorError::transport(context, e)),
            Ok(Err(e)) => Err(MonitorError::decode(context, e)),
            Err(_) => Err(MonitorError::transport(
                context,
                format!("timed out after {}s", self.rpc_timeout.as_secs_f64()),
            )),
        }
    }

    /// Run a raw provider request under the RPC timeout.
    async fn rpc_call<T, E, F>(&self, context: &str, call: F) -> Result<T, MonitorError>
    where
        E: std::fmt::Display,
        F: IntoFuture<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.rpc_timeout, call).await {
            Ok(result) => result.map_err(|e| MonitorError::transport(context, e)),
            Err(_) => Err(MonitorError::transport(
                context,
                format!("timed out after {}s", self.rpc_timeout.as_secs_f64()),
            )),
        }
    }

    /// Pool logs carrying one of the classified event signatures.
    fn pool_filter(&self) -> Filter {
        let signatures: Vec<B256> = event_signatures().keys().copied().collect();
        Filter::new().address(self.pool_address).event_signature(signatures)
    }
}

#[async_trait]
impl AccountDataSource for AaveClient {
    async fn account_position(&self, user: Address) -> Result<AccountPosition, MonitorError> {
        let data = self
            .contract_call("getUserAccountData", self.pool.getUserAccountData(user).call())
            .await?;

        Ok(AccountPosition {
            user,
            total_collateral: data.totalCollateralBase,
            total_debt: data.totalDebtBase,
            health_factor: Wad::from_raw(data.healthFactor),
        })
    }
}

#[async_trait]
impl MarketDataSource for AaveClient {
    async fn reserve_snapshot(&self, asset: Address) -> Result<ReserveSnapshot, MonitorError> {
        let reserve = self
            .contract_call(
                "DataProvider.getReserveData",
                self.data_provider.getReserveData(asset).call(),
            )
            .await?;
        let config = self
            .contract_call(
                "DataProvider.getReserveConfigurationData",
                self.data_provider.getReserveConfigurationData(asset).call(),
            )
            .await?;
        let price = self
            .contract_call("getAssetPrice", self.oracle.getAssetPrice(asset).call())
            .await?;

        let decimals = u256_to_u64(config.decimals)
            .and_then(|d| u32::try_from(d).ok())
            .filter(|d| *d <= 77)
            .ok_or_else(|| MonitorError::decode("getReserveConfigurationData", "decimals out of range"))?;

        let total_debt = reserve.totalStableDebt.saturating_add(reserve.totalVariableDebt);
        let snapshot = ReserveSnapshot {
            total_deposits: scale(reserve.totalAToken, decimals),
            total_borrows: scale(total_debt, decimals),
            utilization: utilization_wad(total_debt, reserve.totalAToken).to_decimal(),
            supply_rate_apr: Ray::from(reserve.liquidityRate).to_apr_percent(),
            borrow_rate_apr: Ray::from(reserve.variableBorrowRate).to_apr_percent(),
            price_usd: price_to_decimal(price),
        };

        debug!(
            asset = %asset,
            decimals,
            utilization = %snapshot.utilization,
            "reserve snapshot"
        );
        Ok(snapshot)
    }

    async fn feed_updated_at(&self, feed: Address) -> Result<u64, MonitorError> {
        let aggregator = IAggregatorV3::new(feed, self.provider.clone());
        let round = self
            .contract_call("latestRoundData", aggregator.latestRoundData().call())
            .await?;

        u256_to_u64(round.updatedAt)
            .ok_or_else(|| MonitorError::decode("latestRoundData", "updatedAt exceeds u64"))
    }
}

#[async_trait]
impl LogSource for AaveClient {
    async fn latest_block(&self) -> Result<u64, MonitorError> {
        self.rpc_call("eth_blockNumber", self.provider.get_block_number())
            .await
    }

    async fn fetch_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<RawLog>, MonitorError> {
        let filter = self.pool_filter().from_block(from_block).to_block(to_block);
        let logs = self
            .rpc_call("eth_getLogs", self.provider.get_logs(&filter))
            .await?;
        Ok(logs.iter().map(raw_log).collect())
    }

    async fn subscribe(&self) -> Result<BoxStream<'static, RawLog>, MonitorError> {
        let filter = self.pool_filter();
        let subscription = self
            .rpc_call("eth_subscribe", self.provider.subscribe_logs(&filter))
            .await?;
        Ok(subscription.into_stream().map(|log| raw_log(&log)).boxed())
    }
}

/// Strip an RPC log down to what classification needs. Pending logs carry
/// no block number or hash; they come through as block 0 / zero hash.
fn raw_log(log: &Log) -> RawLog {
    RawLog {
        topics: log.topics().to_vec(),
        block_number: log.block_number.unwrap_or_default(),
        tx_hash: log.transaction_hash.unwrap_or_default(),
    }
}

fn u256_to_u64(value: U256) -> Option<u64> {
    (value <= U256::from(u64::MAX)).then(|| value.to::<u64>())
}
