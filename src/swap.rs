//! # Swap Engine
//!
//! Pricing along the constant-product curve and the value objects describing
//! a swap. The pure formulas ([`get_output_amount`], [`get_input_amount`]) are
//! shared by quotes and by executed swaps; [`quote`] turns a [`SwapRequest`]
//! into the full state change that the exchange commits.
//!
//! The swap fee is a parameter in basis points. At the default of zero the
//! output is exactly `input * output_reserve / (input_reserve + input)`.

use std::fmt::{self, Debug, Display};

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};
use crate::ledger::Reserves;
use crate::math::{checked_add, checked_sub, wide_div, wide_div_ceil, Amount};
use crate::utils::constants::{FEE_DENOMINATOR, MAX_FEE_BPS};

/// The direction of a swap through the pool.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapDirection {
    /// Native asset in, token out
    NativeToToken,
    /// Token in, native asset out
    TokenToNative,
}

impl SwapDirection {
    /// `(input_reserve, output_reserve)` for this direction.
    #[must_use]
    pub const fn split(self, reserves: &Reserves) -> (Amount, Amount) {
        match self {
            Self::NativeToToken => (reserves.native, reserves.token),
            Self::TokenToNative => (reserves.token, reserves.native),
        }
    }

    /// Reserves after `amount_in` entered and `amount_out` left the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Overflow`] if a reserve would wrap.
    pub fn apply(
        self,
        reserves: &Reserves,
        amount_in: Amount,
        amount_out: Amount,
    ) -> PoolResult<Reserves> {
        let (input_reserve, output_reserve) = self.split(reserves);
        let input_reserve = checked_add(input_reserve, amount_in)?;
        let output_reserve = checked_sub(output_reserve, amount_out)?;
        let total_shares = reserves.total_shares;
        Ok(match self {
            Self::NativeToToken => Reserves::new(input_reserve, output_reserve, total_shares),
            Self::TokenToNative => Reserves::new(output_reserve, input_reserve, total_shares),
        })
    }
}

impl Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Debug for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NativeToToken => write!(f, "native>token"),
            Self::TokenToNative => write!(f, "token>native"),
        }
    }
}

/// A caller's swap intent. Exists only for the duration of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    /// Amount of the input asset offered
    pub input_amount: Amount,
    /// Which asset goes in
    pub direction: SwapDirection,
    /// Smallest acceptable output (slippage bound)
    pub minimum_output: Amount,
}

/// A priced swap and the reserves it leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    /// Which asset goes in
    pub direction: SwapDirection,
    /// Input taken from the caller
    pub amount_in: Amount,
    /// Output paid to the recipient
    pub amount_out: Amount,
    /// Reserves after the swap
    pub reserves: Reserves,
}

/// Validates a swap fee.
///
/// # Errors
///
/// Returns [`PoolError::InvalidFee`] unless `fee_bps < 10_000`.
pub fn check_fee(fee_bps: u16) -> PoolResult<u16> {
    if fee_bps >= MAX_FEE_BPS {
        return Err(PoolError::InvalidFee(fee_bps));
    }
    Ok(fee_bps)
}

/// Input after the fee, scaled by [`FEE_DENOMINATOR`].
fn input_with_fee(input_amount: Amount, fee_bps: u16) -> PoolResult<U256> {
    let fee_factor = FEE_DENOMINATOR - u128::from(check_fee(fee_bps)?);
    Ok(U256::from(input_amount) * U256::from(fee_factor))
}

/// Output received for `input_amount` against the given reserves.
///
/// Rounds down, so the reserve product never decreases.
///
/// # Errors
///
/// * [`PoolError::InvalidAmount`] if either reserve is zero (pool not initialised)
/// * [`PoolError::InvalidFee`] if `fee_bps` is out of range
/// * [`PoolError::Overflow`] if intermediates exceed 256 bits
pub fn get_output_amount(
    input_amount: Amount,
    input_reserve: Amount,
    output_reserve: Amount,
    fee_bps: u16,
) -> PoolResult<Amount> {
    if input_reserve == 0 || output_reserve == 0 {
        return Err(PoolError::InvalidAmount);
    }

    let input_with_fee = input_with_fee(input_amount, fee_bps)?;
    let numerator = input_with_fee
        .checked_mul(U256::from(output_reserve))
        .ok_or(PoolError::Overflow)?;
    let denominator = (U256::from(input_reserve) * U256::from(FEE_DENOMINATOR))
        .checked_add(input_with_fee)
        .ok_or(PoolError::Overflow)?;

    wide_div(numerator, denominator)
}

/// Smallest input that yields at least `output_amount`.
///
/// Rounds up, the mirror of [`get_output_amount`].
///
/// # Errors
///
/// * [`PoolError::InvalidAmount`] if either reserve is zero or `output_amount`
///   would drain the output reserve
/// * [`PoolError::InvalidFee`] if `fee_bps` is out of range
/// * [`PoolError::Overflow`] if the required input does not fit
pub fn get_input_amount(
    output_amount: Amount,
    input_reserve: Amount,
    output_reserve: Amount,
    fee_bps: u16,
) -> PoolResult<Amount> {
    if input_reserve == 0 || output_reserve == 0 || output_amount >= output_reserve {
        return Err(PoolError::InvalidAmount);
    }

    let fee_factor = FEE_DENOMINATOR - u128::from(check_fee(fee_bps)?);
    let numerator = (U256::from(input_reserve) * U256::from(output_amount))
        .checked_mul(U256::from(FEE_DENOMINATOR))
        .ok_or(PoolError::Overflow)?;
    let denominator = U256::from(output_reserve - output_amount) * U256::from(fee_factor);

    wide_div_ceil(numerator, denominator)
}

/// Prices `request` against `reserves` and enforces its slippage bound.
///
/// Nothing is mutated; the caller commits [`SwapQuote::reserves`] only after
/// settlement succeeds.
///
/// # Errors
///
/// * [`PoolError::InvalidAmount`] if the pool is empty
/// * [`PoolError::InsufficientOutputAmount`] if the output is below
///   `request.minimum_output`
/// * [`PoolError::Overflow`] on arithmetic overflow
pub fn quote(reserves: &Reserves, request: &SwapRequest, fee_bps: u16) -> PoolResult<SwapQuote> {
    let (input_reserve, output_reserve) = request.direction.split(reserves);
    let amount_out =
        get_output_amount(request.input_amount, input_reserve, output_reserve, fee_bps)?;

    if amount_out < request.minimum_output {
        return Err(PoolError::InsufficientOutputAmount);
    }

    let after = request.direction.apply(reserves, request.input_amount, amount_out)?;
    debug_assert!(after.product() >= reserves.product(), "reserve product decreased");

    Ok(SwapQuote {
        direction: request.direction,
        amount_in: request.input_amount,
        amount_out,
        reserves: after,
    })
}
