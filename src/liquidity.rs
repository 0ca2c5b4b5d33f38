//! # Liquidity Engine
//!
//! Pure computations for minting shares on deposit and paying out on
//! withdrawal. Neither function touches the ledger: they take the reserves
//! read inside a transaction and return the complete state to commit.

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};
use crate::ledger::Reserves;
use crate::math::{checked_add, checked_sub, mul_div, Amount};

/// Outcome of a deposit: what is consumed, what is minted and the new reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositQuote {
    /// Native asset taken from the provider
    pub native_amount: Amount,
    /// Token asset taken from the provider (may be less than offered)
    pub token_amount: Amount,
    /// Shares credited to the provider
    pub shares_minted: Amount,
    /// Reserves after the deposit
    pub reserves: Reserves,
}

/// Outcome of a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawQuote {
    /// Shares burned from the provider's position
    pub shares_burned: Amount,
    /// Native asset paid out
    pub native_out: Amount,
    /// Token asset paid out
    pub token_out: Amount,
    /// Reserves after the withdrawal
    pub reserves: Reserves,
}

/// Prices a deposit of `native_amount` alongside up to `token_amount` tokens.
///
/// The first deposit into an empty pool sets the ratio and mints one share per
/// native unit. Every later deposit must respect the current ratio: the token
/// amount required for `native_amount` is derived from the reserves, only that
/// amount is consumed, and any excess offered is left with the provider.
///
/// # Errors
///
/// * [`PoolError::InvalidAmount`] if a bootstrap deposit has a zero side, or a
///   later deposit would mint no shares
/// * [`PoolError::RatioMismatch`] if `token_amount` is below the required amount
/// * [`PoolError::Overflow`] if the new reserves do not fit
pub fn deposit(
    reserves: Reserves,
    native_amount: Amount,
    token_amount: Amount,
) -> PoolResult<DepositQuote> {
    if reserves.is_empty() {
        if native_amount == 0 || token_amount == 0 {
            return Err(PoolError::InvalidAmount);
        }
        return Ok(DepositQuote {
            native_amount,
            token_amount,
            shares_minted: native_amount,
            reserves: Reserves::new(native_amount, token_amount, native_amount),
        });
    }

    let required_token = mul_div(reserves.token, native_amount, reserves.native)?;
    if token_amount < required_token {
        return Err(PoolError::RatioMismatch);
    }

    let shares_minted = mul_div(reserves.total_shares, native_amount, reserves.native)?;
    if shares_minted == 0 {
        return Err(PoolError::InvalidAmount);
    }

    Ok(DepositQuote {
        native_amount,
        token_amount: required_token,
        shares_minted,
        reserves: Reserves::new(
            checked_add(reserves.native, native_amount)?,
            checked_add(reserves.token, required_token)?,
            checked_add(reserves.total_shares, shares_minted)?,
        ),
    })
}

/// Prices the redemption of `shares` out of a position of `position` shares.
///
/// Both payouts round down. Redeeming every outstanding share pays out the
/// reserves exactly, so a fully drained pool is back to `(0, 0, 0)`.
///
/// # Errors
///
/// * [`PoolError::InvalidAmount`] if `shares` is zero
/// * [`PoolError::InsufficientShares`] if `shares` exceeds `position`
pub fn withdraw(reserves: Reserves, position: Amount, shares: Amount) -> PoolResult<WithdrawQuote> {
    if shares == 0 {
        return Err(PoolError::InvalidAmount);
    }
    if shares > position || shares > reserves.total_shares {
        return Err(PoolError::InsufficientShares);
    }

    let native_out = mul_div(reserves.native, shares, reserves.total_shares)?;
    let token_out = mul_div(reserves.token, shares, reserves.total_shares)?;

    Ok(WithdrawQuote {
        shares_burned: shares,
        native_out,
        token_out,
        reserves: Reserves::new(
            checked_sub(reserves.native, native_out)?,
            checked_sub(reserves.token, token_out)?,
            checked_sub(reserves.total_shares, shares)?,
        ),
    })
}
