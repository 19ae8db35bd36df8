use alloy::primitives::{address, Address, U256};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::wad_ray::Wad;

// ---------------------------------------------------------------------------
// Numeric Constants
// ---------------------------------------------------------------------------

/// WAD: 1e18, fixed-point scale for health factors.
pub const WAD: Decimal = dec!(1_000_000_000_000_000_000);

/// Decimal places of a WAD value.
pub const WAD_DECIMALS: u32 = 18;

/// Decimal places of a RAY value (Aave interest rates).
pub const RAY_DECIMALS: u32 = 27;

/// Chainlink USD feeds and the Aave oracle report prices with 8 decimals.
pub const USD_PRICE_DECIMALS: u32 = 8;

// ---------------------------------------------------------------------------
// Classification thresholds
// ---------------------------------------------------------------------------

/// HF strictly below 1.0 is liquidatable.
pub const HF_LIQUIDATION_THRESHOLD: Wad = Wad(U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]));

/// HF strictly below 1.2 is a warning.
pub const HF_WARNING_THRESHOLD: Wad = Wad(U256::from_limbs([1_200_000_000_000_000_000, 0, 0, 0]));

/// Utilization at or above 90% is a warning.
pub const UTILIZATION_WARNING: Decimal = dec!(0.90);

/// Utilization strictly above 95% is critical.
pub const UTILIZATION_CRITICAL: Decimal = dec!(0.95);

/// Default maximum oracle staleness (1 hour).
pub const DEFAULT_ORACLE_MAX_STALENESS_SECONDS: u64 = 3_600;

// ---------------------------------------------------------------------------
// Runtime defaults
// ---------------------------------------------------------------------------

/// Label attached to every protocol-scoped metric.
pub const PROTOCOL_LABEL: &str = "aave-v3";

/// Prefix shared by every exported metric.
pub const METRICS_NAMESPACE: &str = "lending";

pub const DEFAULT_INTERVAL_SECONDS: u64 = 30;
pub const DEFAULT_RPC_TIMEOUT_SECONDS: u64 = 10;
pub const WEBHOOK_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_METRICS_LISTEN_ADDR: &str = "0.0.0.0:9090";

// ---------------------------------------------------------------------------
// Aave V3 Ethereum mainnet addresses
// ---------------------------------------------------------------------------

pub const AAVE_V3_POOL: Address = address!("87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2");
pub const AAVE_V3_DATA_PROVIDER: Address = address!("7B4EB56E7CD4b454BA8ff71E4518426369a138a3");
pub const AAVE_V3_ORACLE: Address = address!("54586bE62E3c3580375aE3723C145253060Ca0C2");

pub const CHAINLINK_ETH_USD: Address = address!("5f4eC3Df9cbd43714FE2740f5E3616155c5b8419");

pub const TOKEN_WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const TOKEN_USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
