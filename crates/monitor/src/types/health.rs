use std::time::Duration;

use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{
    HF_LIQUIDATION_THRESHOLD, HF_WARNING_THRESHOLD, UTILIZATION_CRITICAL, UTILIZATION_WARNING,
};

use super::wad_ray::Wad;

/// Result of `Pool.getUserAccountData()` for one account, raw fixed-point.
///
/// Fetched fresh every tick and owned by the evaluation that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountPosition {
    pub user: Address,
    pub total_collateral: U256,
    pub total_debt: U256,
    /// Health factor in WAD (1e18 = HF of 1.0). Meaningless when debt is zero.
    pub health_factor: Wad,
}

impl AccountPosition {
    pub fn has_debt(&self) -> bool {
        !self.total_debt.is_zero()
    }
}

/// Severity bucket shared by health factor, oracle staleness and utilization checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthClassification {
    /// HF >= 1.2.
    Healthy,
    /// 1.0 <= HF < 1.2.
    Warning,
    /// HF < 1.0, liquidatable.
    Critical,
}

impl HealthClassification {
    /// Classify a WAD health factor. Compares raw integers: `1.0` exactly is
    /// Warning and `1.2` exactly is Healthy.
    pub fn from_health_factor(hf: Wad) -> Self {
        if hf < HF_LIQUIDATION_THRESHOLD {
            Self::Critical
        } else if hf < HF_WARNING_THRESHOLD {
            Self::Warning
        } else {
            Self::Healthy
        }
    }

    pub fn is_healthy(self) -> bool {
        self == Self::Healthy
    }
}

/// Staleness rule for a price feed.
pub struct OracleFeedStatus;

impl OracleFeedStatus {
    /// Healthy below `max`, Warning up to and including `2 * max`, Critical beyond.
    pub fn classify(staleness: Duration, max_staleness: Duration) -> HealthClassification {
        if staleness < max_staleness {
            HealthClassification::Healthy
        } else if staleness <= max_staleness.saturating_mul(2) {
            HealthClassification::Warning
        } else {
            HealthClassification::Critical
        }
    }
}

/// Utilization rule for a reserve.
pub struct UtilizationStatus;

impl UtilizationStatus {
    /// Healthy below 0.90, Warning in [0.90, 0.95], Critical above 0.95.
    pub fn classify(ratio: Decimal) -> HealthClassification {
        if ratio < UTILIZATION_WARNING {
            HealthClassification::Healthy
        } else if ratio <= UTILIZATION_CRITICAL {
            HealthClassification::Warning
        } else {
            HealthClassification::Critical
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn hf(value: Decimal) -> Wad {
        Wad::from_decimal(value).unwrap()
    }

    #[test]
    fn test_hf_boundaries() {
        assert_eq!(HealthClassification::from_health_factor(hf(dec!(0.999999))), HealthClassification::Critical);
        assert_eq!(HealthClassification::from_health_factor(hf(dec!(1.0))), HealthClassification::Warning);
        assert_eq!(HealthClassification::from_health_factor(hf(dec!(1.199999))), HealthClassification::Warning);
        assert_eq!(HealthClassification::from_health_factor(hf(dec!(1.2))), HealthClassification::Healthy);
    }

    #[test]
    fn test_hf_one_wei_below_threshold() {
        let below = Wad::from_raw(U256::from(1_199_999_999_999_999_999u128));
        assert_eq!(HealthClassification::from_health_factor(below), HealthClassification::Warning);
    }

    #[test]
    fn test_hf_max_is_healthy() {
        assert_eq!(HealthClassification::from_health_factor(Wad::MAX), HealthClassification::Healthy);
    }

    #[test]
    fn test_oracle_staleness_rule() {
        let max = Duration::from_secs(60 * 60);
        assert_eq!(OracleFeedStatus::classify(Duration::from_secs(59 * 60), max), HealthClassification::Healthy);
        assert_eq!(OracleFeedStatus::classify(max, max), HealthClassification::Warning);
        assert_eq!(OracleFeedStatus::classify(Duration::from_secs(90 * 60), max), HealthClassification::Warning);
        assert_eq!(OracleFeedStatus::classify(Duration::from_secs(120 * 60), max), HealthClassification::Warning);
        assert_eq!(OracleFeedStatus::classify(Duration::from_secs(150 * 60), max), HealthClassification::Critical);
    }

    #[test]
    fn test_utilization_rule() {
        assert_eq!(UtilizationStatus::classify(dec!(0.8999)), HealthClassification::Healthy);
        assert_eq!(UtilizationStatus::classify(dec!(0.90)), HealthClassification::Warning);
        assert_eq!(UtilizationStatus::classify(dec!(0.95)), HealthClassification::Warning);
        assert_eq!(UtilizationStatus::classify(dec!(0.9501)), HealthClassification::Critical);
    }

    #[test]
    fn test_has_debt() {
        let pos = AccountPosition {
            user: Address::ZERO,
            total_collateral: U256::from(1u64),
            total_debt: U256::ZERO,
            health_factor: Wad::MAX,
        };
        assert!(!pos.has_debt());
    }
}
