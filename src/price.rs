//! # Price Query
//!
//! Read-only display helper. Swap math never goes through here: it uses the
//! exact rational formula in [`crate::swap`].

use crate::error::{PoolError, PoolResult};
use crate::math::{mul_div, Amount};
use crate::utils::constants::PRICE_SCALE;

/// Instantaneous price of `reserve_b` in terms of `reserve_a`, scaled by
/// [`PRICE_SCALE`]: `reserve_a * 1000 / reserve_b`, rounded down.
///
/// # Errors
///
/// * [`PoolError::InvalidAmount`] if `reserve_b` is zero
/// * [`PoolError::Overflow`] if the scaled price does not fit
pub fn get_price(reserve_a: Amount, reserve_b: Amount) -> PoolResult<Amount> {
    if reserve_b == 0 {
        return Err(PoolError::InvalidAmount);
    }
    mul_div(reserve_a, PRICE_SCALE, reserve_b)
}
