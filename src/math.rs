//! # Fixed-point arithmetic
//!
//! Integer helpers shared by the liquidity and swap engines. Amounts are
//! `u128`; every product is formed in a 256-bit intermediate so that two
//! 18-decimal reserves can be multiplied without overflow, and the result is
//! narrowed back with an explicit check. All divisions round down unless the
//! name says otherwise, which keeps rounding in the pool's favour.

use alloy::primitives::U256;

use crate::error::{PoolError, PoolResult};

/// An amount of either pool asset in its smallest indivisible unit.
pub type Amount = u128;

/// Narrows a 256-bit intermediate back to an [`Amount`].
///
/// # Errors
///
/// Returns [`PoolError::Overflow`] if the value does not fit in 128 bits.
pub fn narrow(value: U256) -> PoolResult<Amount> {
    Amount::try_from(value).map_err(|_| PoolError::Overflow)
}

/// Exact product of two amounts.
#[must_use]
pub fn product(a: Amount, b: Amount) -> U256 {
    U256::from(a) * U256::from(b)
}

/// Computes `floor(a * b / denominator)`.
///
/// # Errors
///
/// * [`PoolError::InvalidAmount`] if `denominator` is zero
/// * [`PoolError::Overflow`] if the quotient does not fit in an [`Amount`]
pub fn mul_div(a: Amount, b: Amount, denominator: Amount) -> PoolResult<Amount> {
    wide_div(product(a, b), U256::from(denominator))
}

/// Computes `ceil(a * b / denominator)`.
///
/// # Errors
///
/// * [`PoolError::InvalidAmount`] if `denominator` is zero
/// * [`PoolError::Overflow`] if the quotient does not fit in an [`Amount`]
pub fn mul_div_ceil(a: Amount, b: Amount, denominator: Amount) -> PoolResult<Amount> {
    wide_div_ceil(product(a, b), U256::from(denominator))
}

/// Floor division of two 256-bit intermediates, narrowed to an [`Amount`].
///
/// # Errors
///
/// * [`PoolError::InvalidAmount`] if `denominator` is zero
/// * [`PoolError::Overflow`] if the quotient does not fit in an [`Amount`]
pub fn wide_div(numerator: U256, denominator: U256) -> PoolResult<Amount> {
    let quotient = numerator
        .checked_div(denominator)
        .ok_or(PoolError::InvalidAmount)?;
    narrow(quotient)
}

/// Ceiling division of two 256-bit intermediates, narrowed to an [`Amount`].
///
/// # Errors
///
/// * [`PoolError::InvalidAmount`] if `denominator` is zero
/// * [`PoolError::Overflow`] if the quotient does not fit in an [`Amount`]
pub fn wide_div_ceil(numerator: U256, denominator: U256) -> PoolResult<Amount> {
    if denominator.is_zero() {
        return Err(PoolError::InvalidAmount);
    }
    let quotient = numerator / denominator;
    let rounded = if (numerator % denominator).is_zero() {
        quotient
    } else {
        quotient + U256::from(1)
    };
    narrow(rounded)
}

/// Checked addition.
///
/// # Errors
///
/// Returns [`PoolError::Overflow`] on wrap.
pub fn checked_add(a: Amount, b: Amount) -> PoolResult<Amount> {
    a.checked_add(b).ok_or(PoolError::Overflow)
}

/// Checked subtraction.
///
/// # Errors
///
/// Returns [`PoolError::Overflow`] if `b > a`.
pub fn checked_sub(a: Amount, b: Amount) -> PoolResult<Amount> {
    a.checked_sub(b).ok_or(PoolError::Overflow)
}
