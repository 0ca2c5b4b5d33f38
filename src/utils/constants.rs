/// Scale applied by [`crate::price::get_price`] so integer prices keep three decimals
pub const PRICE_SCALE: u128 = 1_000;

/// Denominator for swap fees expressed in basis points
pub const FEE_DENOMINATOR: u128 = 10_000;

/// Upper bound (exclusive) for a configured swap fee, in basis points
pub const MAX_FEE_BPS: u16 = 10_000;

/// One whole unit (1 ether) in the smallest indivisible unit
pub const WEI_PER_UNIT: u128 = 1_000_000_000_000_000_000;
