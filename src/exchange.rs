//! # Exchange
//!
//! The public pool surface. Every state-changing operation follows the same
//! shape:
//!
//! 1. open a ledger transaction (write lock) and read the reserves,
//! 2. compute the result with the liquidity or swap engine,
//! 3. check it against the caller's bounds,
//! 4. settle the asset transfers through the collaborators,
//! 5. commit the new reserves.
//!
//! A failure at any step returns before the commit, and settlement reverses
//! its own executed legs, so a rejected operation leaves the pool and the
//! collaborators' balances as they were. The one exception is
//! [`PoolError::Diverged`], returned when a reversal is itself refused.
//!
//! The pool's own account never takes part as a counterparty: paying itself
//! would shrink the reserves without moving any funds.

use std::fmt::{self, Debug};
use std::sync::Arc;

use alloy::primitives::Address;

use crate::assets::{CallContext, Leg, NativeTransport, Settlement, TokenLedger};
use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::ledger::{PositionUpdate, ReserveLedger, Reserves};
use crate::liquidity;
use crate::math::{checked_add, checked_sub, Amount};
use crate::price;
use crate::swap::{self, SwapDirection, SwapQuote, SwapRequest};

/// A constant-product pool pairing the native asset with one token.
pub struct Exchange<T: TokenLedger, N: NativeTransport> {
    /// The pool's own account on both ledgers
    address: Address,
    /// Fixed pool parameters
    config: PoolConfig,
    /// Reserves, shares and positions
    ledger: ReserveLedger,
    /// Token collaborator
    token: Arc<T>,
    /// Native asset collaborator
    native: Arc<N>,
}

impl<T: TokenLedger, N: NativeTransport> Debug for Exchange<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Exchange({}, {}, fee {} bps)",
            self.address,
            self.ledger.read(),
            self.config.fee_bps()
        )
    }
}

impl<T: TokenLedger, N: NativeTransport> Exchange<T, N> {
    /// Creates an empty pool living at `address`.
    ///
    /// # Arguments
    ///
    /// * `address` - The pool's account on both ledgers
    /// * `token` - The token ledger
    /// * `native` - The native asset transport
    /// * `config` - Pool parameters
    pub fn new(address: Address, token: Arc<T>, native: Arc<N>, config: PoolConfig) -> Self {
        log::info!(
            "exchange: created at {address} with fee {} bps",
            config.fee_bps()
        );
        Self {
            address,
            config,
            ledger: ReserveLedger::new(),
            token,
            native,
        }
    }

    /// The pool's account.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Pool parameters.
    #[must_use]
    pub const fn config(&self) -> PoolConfig {
        self.config
    }

    /// The token collaborator.
    #[must_use]
    pub fn token(&self) -> &T {
        &self.token
    }

    /// The native asset collaborator.
    #[must_use]
    pub fn native(&self) -> &N {
        &self.native
    }

    /// A consistent snapshot of reserves and total shares.
    #[must_use]
    pub fn snapshot(&self) -> Reserves {
        self.ledger.read()
    }

    /// Token reserve.
    #[must_use]
    pub fn get_reserve(&self) -> Amount {
        self.ledger.read().token
    }

    /// Native reserve.
    #[must_use]
    pub fn native_reserve(&self) -> Amount {
        self.ledger.read().native
    }

    /// Shares outstanding.
    #[must_use]
    pub fn total_shares(&self) -> Amount {
        self.ledger.read().total_shares
    }

    /// Shares held by `provider`.
    #[must_use]
    pub fn shares_of(&self, provider: &Address) -> Amount {
        self.ledger.position(provider)
    }

    /// Price of `reserve_b` in `reserve_a`, scaled by 1000.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidAmount`] if `reserve_b` is zero.
    pub fn get_price(&self, reserve_a: Amount, reserve_b: Amount) -> PoolResult<Amount> {
        price::get_price(reserve_a, reserve_b)
    }

    /// Tokens a swap of `native_in` would return right now.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidAmount`] if the pool is empty.
    pub fn get_token_amount(&self, native_in: Amount) -> PoolResult<Amount> {
        self.get_amount(SwapDirection::NativeToToken, native_in)
    }

    /// Native asset a swap of `token_in` would return right now.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidAmount`] if the pool is empty.
    pub fn get_eth_amount(&self, token_in: Amount) -> PoolResult<Amount> {
        self.get_amount(SwapDirection::TokenToNative, token_in)
    }

    /// Output for `amount_in` in `direction` against the current reserves.
    fn get_amount(&self, direction: SwapDirection, amount_in: Amount) -> PoolResult<Amount> {
        let (input_reserve, output_reserve) = direction.split(&self.ledger.read());
        let amount_out = swap::get_output_amount(
            amount_in,
            input_reserve,
            output_reserve,
            self.config.fee_bps(),
        )?;
        log::debug!("exchange: quote {direction} {amount_in} -> {amount_out}");
        Ok(amount_out)
    }

    /// Input needed in `direction` to receive at least `amount_out` right now.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidAmount`] if the pool is empty or
    /// `amount_out` would drain the output reserve.
    pub fn required_input(
        &self,
        direction: SwapDirection,
        amount_out: Amount,
    ) -> PoolResult<Amount> {
        let (input_reserve, output_reserve) = direction.split(&self.ledger.read());
        swap::get_input_amount(amount_out, input_reserve, output_reserve, self.config.fee_bps())
    }

    /// Deposits `ctx.value` native units plus the matching amount of tokens
    /// (at most `token_amount`) and credits the caller with new shares.
    ///
    /// The first deposit sets the ratio and takes `token_amount` in full.
    /// Later deposits take only the tokens the current ratio requires; the
    /// pool's allowance must cover them.
    ///
    /// # Returns
    ///
    /// The number of shares minted
    ///
    /// # Errors
    ///
    /// * [`PoolError::InvalidAmount`] for a zero-sided bootstrap deposit or a
    ///   deposit too small to mint a share
    /// * [`PoolError::RatioMismatch`] if `token_amount` is below the required amount
    /// * [`PoolError::Transfer`] if either asset cannot be collected
    /// * [`PoolError::Diverged`] if a refused transfer could not be reversed
    /// * [`PoolError::InvalidCounterparty`] if the pool itself is a party
    pub fn add_liquidity(&self, ctx: CallContext, token_amount: Amount) -> PoolResult<Amount> {
        self.reject_self(ctx.caller)?;
        let txn = self.ledger.transaction();
        let reserves = txn.reserves();

        let quote = liquidity::deposit(reserves, ctx.value, token_amount)
            .inspect_err(|err| {
                log::warn!("exchange: add_liquidity by {} rejected: {err}", ctx.caller);
            })?;
        let position = checked_add(txn.position(&ctx.caller), quote.shares_minted)?;

        self.settle(&[
            Leg::PullNative {
                from: ctx.caller,
                amount: quote.native_amount,
            },
            Leg::PullToken {
                from: ctx.caller,
                amount: quote.token_amount,
            },
        ])?;

        txn.commit(
            quote.reserves,
            Some(PositionUpdate {
                provider: ctx.caller,
                shares: position,
            }),
        );
        log::info!(
            "exchange: {} added {} native + {} token for {} shares, {}",
            ctx.caller,
            quote.native_amount,
            quote.token_amount,
            quote.shares_minted,
            quote.reserves
        );
        Ok(quote.shares_minted)
    }

    /// Burns `shares` of the caller's position and pays out the proportional
    /// reserves.
    ///
    /// # Returns
    ///
    /// `(native_out, token_out)`
    ///
    /// # Errors
    ///
    /// * [`PoolError::InvalidAmount`] if `shares` is zero or native value is attached
    /// * [`PoolError::InsufficientShares`] if the caller holds fewer shares
    /// * [`PoolError::Transfer`] if a payout is refused
    /// * [`PoolError::Diverged`] if a refused transfer could not be reversed
    /// * [`PoolError::InvalidCounterparty`] if the pool itself is a party
    pub fn remove_liquidity(
        &self,
        ctx: CallContext,
        shares: Amount,
    ) -> PoolResult<(Amount, Amount)> {
        reject_value(&ctx)?;
        self.reject_self(ctx.caller)?;
        let txn = self.ledger.transaction();
        let position = txn.position(&ctx.caller);

        let quote = liquidity::withdraw(txn.reserves(), position, shares)
            .inspect_err(|err| {
                log::warn!("exchange: remove_liquidity by {} rejected: {err}", ctx.caller);
            })?;
        let remaining = checked_sub(position, quote.shares_burned)?;

        // a refusable native payout runs before any token leaves the pool
        self.settle(&[
            Leg::PushNative {
                to: ctx.caller,
                amount: quote.native_out,
            },
            Leg::PushToken {
                to: ctx.caller,
                amount: quote.token_out,
            },
        ])?;

        txn.commit(
            quote.reserves,
            Some(PositionUpdate {
                provider: ctx.caller,
                shares: remaining,
            }),
        );
        log::info!(
            "exchange: {} removed {} shares for {} native + {} token, {}",
            ctx.caller,
            quote.shares_burned,
            quote.native_out,
            quote.token_out,
            quote.reserves
        );
        Ok((quote.native_out, quote.token_out))
    }

    /// Swaps the attached native value for at least `min_tokens` tokens, paid
    /// to the caller.
    ///
    /// # Errors
    ///
    /// * [`PoolError::InvalidAmount`] if the pool is empty
    /// * [`PoolError::InsufficientOutputAmount`] if fewer than `min_tokens` would be paid
    /// * [`PoolError::Transfer`] if settlement fails
    /// * [`PoolError::Diverged`] if a refused transfer could not be reversed
    /// * [`PoolError::InvalidCounterparty`] if the pool itself is a party
    pub fn eth_to_token_swap(&self, ctx: CallContext, min_tokens: Amount) -> PoolResult<Amount> {
        self.eth_to_token_transfer(ctx, min_tokens, ctx.caller)
    }

    /// Same as [`Exchange::eth_to_token_swap`] but pays `recipient`.
    ///
    /// # Errors
    ///
    /// See [`Exchange::eth_to_token_swap`].
    pub fn eth_to_token_transfer(
        &self,
        ctx: CallContext,
        min_tokens: Amount,
        recipient: Address,
    ) -> PoolResult<Amount> {
        let request = SwapRequest {
            input_amount: ctx.value,
            direction: SwapDirection::NativeToToken,
            minimum_output: min_tokens,
        };
        self.swap(ctx.caller, &request, recipient)
            .map(|quote| quote.amount_out)
    }

    /// Swaps `token_in` tokens (pulled with the pool's allowance) for at
    /// least `min_native` of the native asset, paid to the caller.
    ///
    /// # Errors
    ///
    /// * [`PoolError::InvalidAmount`] if the pool is empty or native value is attached
    /// * [`PoolError::InsufficientOutputAmount`] if less than `min_native` would be paid
    /// * [`PoolError::Transfer`] if settlement fails
    /// * [`PoolError::Diverged`] if a refused transfer could not be reversed
    /// * [`PoolError::InvalidCounterparty`] if the pool itself is a party
    pub fn token_to_eth_swap(
        &self,
        ctx: CallContext,
        token_in: Amount,
        min_native: Amount,
    ) -> PoolResult<Amount> {
        reject_value(&ctx)?;
        let request = SwapRequest {
            input_amount: token_in,
            direction: SwapDirection::TokenToNative,
            minimum_output: min_native,
        };
        self.swap(ctx.caller, &request, ctx.caller)
            .map(|quote| quote.amount_out)
    }

    /// Executes `request` for `payer`, delivering the output to `recipient`.
    ///
    /// # Errors
    ///
    /// * [`PoolError::InvalidAmount`] if the pool is empty
    /// * [`PoolError::InsufficientOutputAmount`] if the slippage bound is not met
    /// * [`PoolError::Transfer`] if settlement fails
    /// * [`PoolError::Diverged`] if a refused transfer could not be reversed
    /// * [`PoolError::InvalidCounterparty`] if the pool itself is a party
    pub fn swap(
        &self,
        payer: Address,
        request: &SwapRequest,
        recipient: Address,
    ) -> PoolResult<SwapQuote> {
        self.reject_self(payer)?;
        self.reject_self(recipient)?;
        let txn = self.ledger.transaction();
        let before = txn.reserves();

        let quote = swap::quote(&before, request, self.config.fee_bps())
            .inspect_err(|err| {
                log::warn!("exchange: swap {} by {payer} rejected: {err}", request.direction);
            })?;

        let legs = match request.direction {
            SwapDirection::NativeToToken => [
                Leg::PullNative {
                    from: payer,
                    amount: quote.amount_in,
                },
                Leg::PushToken {
                    to: recipient,
                    amount: quote.amount_out,
                },
            ],
            SwapDirection::TokenToNative => [
                Leg::PullToken {
                    from: payer,
                    amount: quote.amount_in,
                },
                Leg::PushNative {
                    to: recipient,
                    amount: quote.amount_out,
                },
            ],
        };
        self.settle(&legs)?;

        txn.commit(quote.reserves, None);
        log::info!(
            "exchange: swap {} {} -> {} for {recipient}, {}",
            quote.direction,
            quote.amount_in,
            quote.amount_out,
            quote.reserves
        );
        Ok(quote)
    }

    /// Runs `legs` against the collaborators as one all-or-nothing journal.
    fn settle(&self, legs: &[Leg]) -> PoolResult<()> {
        Settlement::new(self.token.as_ref(), self.native.as_ref(), self.address)
            .execute(legs)
    }

    /// Rejects the pool's own account as a counterparty.
    fn reject_self(&self, account: Address) -> PoolResult<()> {
        if account == self.address {
            return Err(PoolError::InvalidCounterparty);
        }
        Ok(())
    }
}

/// Rejects native value attached to an operation that does not take any.
const fn reject_value(ctx: &CallContext) -> PoolResult<()> {
    if ctx.value != 0 {
        return Err(PoolError::InvalidAmount);
    }
    Ok(())
}
