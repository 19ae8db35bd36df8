//! Fixed-point scaling for on-chain integers.
//!
//! Threshold decisions compare raw `U256` values (see [`Wad`]'s `Ord`); the
//! `Decimal` produced by [`scale`] is for arithmetic on small ratios, display
//! and metric export.

use alloy::primitives::U256;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;

use crate::constants::{RAY_DECIMALS, USD_PRICE_DECIMALS, WAD, WAD_DECIMALS};

/// Largest scale `Decimal` can carry.
const MAX_DECIMAL_SCALE: u32 = 28;

/// Largest mantissa `Decimal` can carry (2^96 - 1).
const MAX_DECIMAL_MANTISSA: u128 = (1u128 << 96) - 1;

/// Convert a fixed-point integer with `decimals` implied decimal places to `Decimal`.
///
/// Exact whenever `raw` fits a 96-bit mantissa and `decimals <= 28`. Larger
/// inputs are split into whole and fractional parts and only low-order
/// fractional digits are lost. Values whose whole part exceeds the `Decimal`
/// range saturate to `Decimal::MAX` (Aave reports `type(uint256).max` as the
/// health factor of a debt-free account).
pub fn scale(raw: U256, decimals: u32) -> Decimal {
    if decimals <= MAX_DECIMAL_SCALE && raw <= U256::from(MAX_DECIMAL_MANTISSA) {
        if let Ok(exact) = Decimal::try_from_i128_with_scale(raw.to::<u128>() as i128, decimals) {
            return exact;
        }
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = raw / divisor;
    let frac = raw % divisor;

    if whole > U256::from(MAX_DECIMAL_MANTISSA) {
        return Decimal::MAX;
    }
    let Some(whole_dec) = Decimal::from_u128(whole.to::<u128>()) else {
        return Decimal::MAX;
    };

    // Drop fractional digits beyond what Decimal can represent.
    let (frac, frac_scale) = if decimals > MAX_DECIMAL_SCALE {
        let cut = U256::from(10u64).pow(U256::from(decimals - MAX_DECIMAL_SCALE));
        (frac / cut, MAX_DECIMAL_SCALE)
    } else {
        (frac, decimals)
    };

    match Decimal::try_from_i128_with_scale(frac.to::<u128>() as i128, frac_scale) {
        Ok(frac_dec) => whole_dec.checked_add(frac_dec).unwrap_or(whole_dec),
        Err(_) => whole_dec,
    }
}

/// Lossy conversion for display and gauges. Never use for threshold checks.
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::MAX)
}

// ---------------------------------------------------------------------------
// WAD (1e18): health factors
// ---------------------------------------------------------------------------

/// WAD-scaled value (18 decimals). Ordering compares the raw integers, so
/// threshold checks never pass through a lossy conversion.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wad(pub U256);

impl Wad {
    pub const ONE: Wad = Wad(U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]));
    pub const ZERO: Wad = Wad(U256::ZERO);
    pub const MAX: Wad = Wad(U256::MAX);

    /// Convert on-chain WAD (U256) to off-chain `Decimal`.
    pub fn to_decimal(self) -> Decimal {
        scale(self.0, WAD_DECIMALS)
    }

    /// Inverse of [`Wad::to_decimal`], truncating digits beyond 18 decimals.
    /// Returns `None` for negative or out-of-range inputs.
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        if value.is_sign_negative() {
            return None;
        }
        let scaled = value.checked_mul(WAD)?.trunc();
        Some(Self(U256::from(scaled.to_u128()?)))
    }

    /// Create from a `U256` that is already WAD-scaled.
    pub fn from_raw(val: U256) -> Self {
        Self(val)
    }

    /// Inner `U256`.
    pub fn raw(self) -> U256 {
        self.0
    }
}

impl fmt::Debug for Wad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wad({})", self.to_decimal())
    }
}

impl fmt::Display for Wad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl From<U256> for Wad {
    fn from(val: U256) -> Self {
        Self(val)
    }
}

// ---------------------------------------------------------------------------
// RAY (1e27): Aave interest rates
// ---------------------------------------------------------------------------

/// RAY-scaled value (27 decimals). Used for Aave interest rates.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ray(pub U256);

impl Ray {
    pub const ZERO: Ray = Ray(U256::ZERO);

    /// Convert on-chain RAY (U256) to off-chain `Decimal`.
    pub fn to_decimal(self) -> Decimal {
        scale(self.0, RAY_DECIMALS)
    }

    /// Convert RAY interest rate to APR percentage (× 100).
    pub fn to_apr_percent(self) -> Decimal {
        self.to_decimal() * dec!(100)
    }
}

impl fmt::Debug for Ray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ray({})", self.to_decimal())
    }
}

impl From<U256> for Ray {
    fn from(val: U256) -> Self {
        Self(val)
    }
}

/// Convert an 8-decimal USD price (Chainlink / Aave oracle) to `Decimal`.
pub fn price_to_decimal(raw: U256) -> Decimal {
    scale(raw, USD_PRICE_DECIMALS)
}

/// Borrowed / supplied as a WAD ratio, computed in the integer domain.
/// Zero supply yields zero utilization.
pub fn utilization_wad(total_debt: U256, total_supplied: U256) -> Wad {
    if total_supplied.is_zero() {
        return Wad::ZERO;
    }
    let wad = U256::from(1_000_000_000_000_000_000u64);
    match total_debt.checked_mul(wad) {
        Some(numerator) => Wad(numerator / total_supplied),
        // Debt so large that debt * 1e18 overflows: divide first.
        None => Wad((total_debt / total_supplied).saturating_mul(wad)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wad_one_is_one() {
        assert_eq!(Wad::ONE.to_decimal(), dec!(1));
    }

    #[test]
    fn test_wad_zero() {
        assert_eq!(Wad::ZERO.to_decimal(), dec!(0));
    }

    #[test]
    fn test_wad_health_factor() {
        // 1.05e18 = health factor of 1.05
        let hf = Wad::from_raw(U256::from(1_050_000_000_000_000_000u128));
        assert_eq!(hf.to_decimal(), dec!(1.05));
    }

    #[test]
    fn test_wad_max_saturates() {
        assert_eq!(Wad::MAX.to_decimal(), Decimal::MAX);
    }

    #[test]
    fn test_wad_ordering_is_integer_ordering() {
        let just_below = Wad::from_raw(U256::from(999_999_999_999_999_999u128));
        assert!(just_below < Wad::ONE);
        assert!(Wad::ONE < Wad::from_raw(U256::from(1_000_000_000_000_000_001u128)));
    }

    #[test]
    fn test_wad_from_decimal() {
        assert_eq!(Wad::from_decimal(dec!(1.2)), Some(Wad::from_raw(U256::from(1_200_000_000_000_000_000u128))));
        assert_eq!(Wad::from_decimal(dec!(-0.1)), None);
    }

    #[test]
    fn test_scale_six_decimals() {
        // 2500.5 USDC
        assert_eq!(scale(U256::from(2_500_500_000u64), 6), dec!(2500.5));
    }

    #[test]
    fn test_scale_beyond_mantissa() {
        // 1e30 raw with 18 decimals = 1e12, does not fit the 96-bit fast path.
        let raw = U256::from(10u64).pow(U256::from(30u64));
        assert_eq!(scale(raw, 18), dec!(1_000_000_000_000));
    }

    #[test]
    fn test_scale_more_than_28_decimals() {
        // 1.5 with 30 implied decimals.
        let raw = U256::from(15u64) * U256::from(10u64).pow(U256::from(29u64));
        assert_eq!(scale(raw, 30), dec!(1.5));
    }

    #[test]
    fn test_scale_zero_decimals() {
        assert_eq!(scale(U256::from(42u64), 0), dec!(42));
    }

    #[test]
    fn test_ray_to_apr() {
        // 3% APR in RAY = 0.03 * 1e27 = 3e25
        let rate = Ray::from(U256::from(30_000_000_000_000_000_000_000_000u128));
        assert_eq!(rate.to_apr_percent(), dec!(3));
    }

    #[test]
    fn test_price_to_decimal() {
        // $2500.00 in 8-decimal format = 250_000_000_000
        let raw = U256::from(250_000_000_000u128);
        assert_eq!(price_to_decimal(raw), dec!(2500));
    }

    #[test]
    fn test_utilization_wad() {
        let u = utilization_wad(U256::from(920u64), U256::from(1000u64));
        assert_eq!(u.to_decimal(), dec!(0.92));
        assert_eq!(utilization_wad(U256::from(5u64), U256::ZERO), Wad::ZERO);
    }

    #[test]
    fn test_to_f64_display_only() {
        assert!((to_f64(dec!(1.05)) - 1.05).abs() < 1e-12);
    }
}
