use rust_decimal::Decimal;

/// Per-reserve market state read once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ReserveSnapshot {
    /// aToken supply in token units.
    pub total_deposits: Decimal,
    /// Stable + variable debt in token units.
    pub total_borrows: Decimal,
    /// Borrowed / supplied, in [0, 1].
    pub utilization: Decimal,
    pub supply_rate_apr: Decimal,
    pub borrow_rate_apr: Decimal,
    pub price_usd: Decimal,
}
