//! Compile-time ABI definitions for the contracts the monitor reads via Alloy `sol!`.
//!
//! Read-only surface only: account data, reserve data, prices, feed rounds and
//! the Pool events the indexer classifies.

#![allow(clippy::too_many_arguments)]

use alloy::sol;

// ---------------------------------------------------------------------------
// Aave V3 Pool
// ---------------------------------------------------------------------------

sol! {
    /// Aave V3 Pool contract.
    #[sol(rpc)]
    interface IPool {
        /// Get aggregated user position data.
        function getUserAccountData(address user) external view returns (
            uint256 totalCollateralBase,
            uint256 totalDebtBase,
            uint256 availableBorrowsBase,
            uint256 currentLiquidationThreshold,
            uint256 ltv,
            uint256 healthFactor
        );

        event Supply(
            address indexed reserve,
            address user,
            address indexed onBehalfOf,
            uint256 amount,
            uint16 indexed referralCode
        );

        event Borrow(
            address indexed reserve,
            address user,
            address indexed onBehalfOf,
            uint256 amount,
            uint8 interestRateMode,
            uint256 borrowRate,
            uint16 indexed referralCode
        );

        event Repay(
            address indexed reserve,
            address indexed user,
            address indexed repayer,
            uint256 amount,
            bool useATokens
        );

        event LiquidationCall(
            address indexed collateralAsset,
            address indexed debtAsset,
            address indexed user,
            uint256 debtToCover,
            uint256 liquidatedCollateralAmount,
            address liquidator,
            bool receiveAToken
        );
    }
}

// ---------------------------------------------------------------------------
// Aave V3 Pool Data Provider
// ---------------------------------------------------------------------------

sol! {
    /// Aave V3 PoolDataProvider: read-only reserve data.
    #[sol(rpc)]
    interface IPoolDataProvider {
        /// Get reserve data (12 flat values).
        function getReserveData(address asset) external view returns (
            uint256 unbacked,
            uint256 accruedToTreasuryScaled,
            uint256 totalAToken,
            uint256 totalStableDebt,
            uint256 totalVariableDebt,
            uint256 liquidityRate,
            uint256 variableBorrowRate,
            uint256 stableBorrowRate,
            uint256 averageStableBorrowRate,
            uint256 liquidityIndex,
            uint256 variableBorrowIndex,
            uint40 lastUpdateTimestamp
        );

        /// Get reserve configuration parameters.
        function getReserveConfigurationData(address asset) external view returns (
            uint256 decimals,
            uint256 ltv,
            uint256 liquidationThreshold,
            uint256 liquidationBonus,
            uint256 reserveFactor,
            bool usageAsCollateralEnabled,
            bool borrowingEnabled,
            bool stableBorrowRateEnabled,
            bool isActive,
            bool isFrozen
        );
    }
}

// ---------------------------------------------------------------------------
// Aave V3 Oracle
// ---------------------------------------------------------------------------

sol! {
    /// Aave V3 Oracle. Wraps Chainlink feeds and returns prices in base currency (USD 8 decimals).
    #[sol(rpc)]
    interface IAaveOracle {
        function getAssetPrice(address asset) external view returns (uint256 price);
    }
}

// ---------------------------------------------------------------------------
// Chainlink Aggregator V3
// ---------------------------------------------------------------------------

sol! {
    /// Chainlink price feed interface, used for staleness checks.
    #[sol(rpc)]
    interface IAggregatorV3 {
        function latestRoundData() external view returns (
            uint80 roundId,
            int256 answer,
            uint256 startedAt,
            uint256 updatedAt,
            uint80 answeredInRound
        );
    }
}
