//! # External asset collaborators
//!
//! The pool does not keep anyone's balances but its own reserves. Moving
//! assets in and out goes through two narrow traits supplied by the execution
//! environment:
//!
//! - [`TokenLedger`] for the fungible token (`transfer_from` with an
//!   allowance, `transfer` out of an account),
//! - [`NativeTransport`] for the native asset (value attached to a call is
//!   pulled from the caller, payouts are direct sends).
//!
//! A [`Settlement`] runs the transfers of one operation as a journal: legs
//! execute in order and, if one is rejected, the legs already executed are
//! reversed newest first. Together with committing reserves only after a
//! successful settlement this makes each operation all-or-nothing.
//!
//! Reversing a pull is a payment out of the pool's own account. Reversing a
//! push takes the payout back from its recipient, which only works while the
//! environment still lets the pool move those funds. Callers therefore order
//! pulls before pushes and put the payout most likely to be refused first.
//! When a reversal is refused the journal reports [`PoolError::Diverged`].

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult, TransferError};
use crate::math::Amount;

/// A fungible token ledger.
pub trait TokenLedger: Send + Sync {
    /// Moves `amount` from `owner` to `recipient`, spending the allowance
    /// `owner` granted to `spender`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] if the allowance or balance is too small,
    /// or the ledger refuses the transfer.
    fn transfer_from(
        &self,
        spender: Address,
        owner: Address,
        recipient: Address,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// Moves `amount` out of `sender`'s own balance.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] if the balance is too small or the ledger
    /// refuses the transfer.
    fn transfer(
        &self,
        sender: Address,
        recipient: Address,
        amount: Amount,
    ) -> Result<(), TransferError>;
}

/// Native asset movements performed by the execution environment.
pub trait NativeTransport: Send + Sync {
    /// Moves `amount` of the native asset from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] if `from` cannot pay or `to` refuses.
    fn send(&self, from: Address, to: Address, amount: Amount) -> Result<(), TransferError>;
}

/// Identity of the caller and native value attached to the call.
///
/// Supplied by the execution environment and trusted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Account invoking the operation
    pub caller: Address,
    /// Native asset attached to the call
    pub value: Amount,
}

impl CallContext {
    /// A call carrying no native value.
    #[must_use]
    pub const fn new(caller: Address) -> Self {
        Self { caller, value: 0 }
    }

    /// A call carrying `value` native units.
    #[must_use]
    pub const fn with_value(caller: Address, value: Amount) -> Self {
        Self { caller, value }
    }
}

/// One directed transfer of one asset, seen from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    /// Native value attached to the call, moved into the pool
    PullNative {
        /// Payer
        from: Address,
        /// Amount received
        amount: Amount,
    },
    /// Tokens pulled into the pool using the payer's allowance
    PullToken {
        /// Payer
        from: Address,
        /// Amount received
        amount: Amount,
    },
    /// Native asset paid out of the pool
    PushNative {
        /// Recipient
        to: Address,
        /// Amount paid
        amount: Amount,
    },
    /// Tokens paid out of the pool
    PushToken {
        /// Recipient
        to: Address,
        /// Amount paid
        amount: Amount,
    },
}

impl Leg {
    /// Amount moved by this leg.
    #[must_use]
    pub const fn amount(&self) -> Amount {
        match self {
            Self::PullNative { amount, .. }
            | Self::PullToken { amount, .. }
            | Self::PushNative { amount, .. }
            | Self::PushToken { amount, .. } => *amount,
        }
    }
}

/// Journal of the transfers belonging to one pool operation.
pub struct Settlement<'a, T: ?Sized, N: ?Sized> {
    /// Token side
    token: &'a T,
    /// Native side
    native: &'a N,
    /// The pool's own account
    pool: Address,
    /// Legs executed so far, oldest first
    executed: Vec<Leg>,
}

impl<'a, T, N> Settlement<'a, T, N>
where
    T: TokenLedger + ?Sized,
    N: NativeTransport + ?Sized,
{
    /// Starts an empty journal for the pool account `pool`.
    pub const fn new(token: &'a T, native: &'a N, pool: Address) -> Self {
        Self {
            token,
            native,
            pool,
            executed: Vec::new(),
        }
    }

    /// Executes `legs` in order. Zero-amount legs are skipped.
    ///
    /// On the first rejection every leg already executed is reversed, newest
    /// first, and the rejection is returned.
    ///
    /// # Errors
    ///
    /// * [`PoolError::Transfer`] with the rejected leg's error when every
    ///   executed leg was reversed
    /// * [`PoolError::Diverged`] with the first failed reversal otherwise
    pub fn execute(mut self, legs: &[Leg]) -> PoolResult<()> {
        for leg in legs.iter().filter(|leg| leg.amount() > 0) {
            if let Err(err) = self.run(leg) {
                log::warn!("settlement: {leg:?} rejected: {err}");
                return Err(match self.unwind() {
                    Some(reversal) => PoolError::Diverged(reversal),
                    None => PoolError::Transfer(err),
                });
            }
            self.executed.push(*leg);
        }
        Ok(())
    }

    /// Performs a single leg.
    fn run(&self, leg: &Leg) -> Result<(), TransferError> {
        match *leg {
            Leg::PullNative { from, amount } => self.native.send(from, self.pool, amount),
            Leg::PullToken { from, amount } => {
                self.token.transfer_from(self.pool, from, self.pool, amount)
            }
            Leg::PushNative { to, amount } => self.native.send(self.pool, to, amount),
            Leg::PushToken { to, amount } => self.token.transfer(self.pool, to, amount),
        }
    }

    /// Reverses executed legs, newest first, returning the first reversal
    /// that failed.
    fn unwind(&mut self) -> Option<TransferError> {
        let mut failed = None;
        while let Some(leg) = self.executed.pop() {
            let reversed = match leg {
                Leg::PullNative { from, amount } => self.native.send(self.pool, from, amount),
                Leg::PullToken { from, amount } => self.token.transfer(self.pool, from, amount),
                Leg::PushNative { to, amount } => self.native.send(to, self.pool, amount),
                Leg::PushToken { to, amount } => self.token.transfer(to, self.pool, amount),
            };
            if let Err(err) = reversed {
                log::error!("settlement: failed to reverse {leg:?}: {err}");
                failed.get_or_insert(err);
            }
        }
        failed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::native::NativeBank;
    use crate::test_helpers::{address, GuardedToken, RejectingTransport};
    use crate::token::Token;

    #[test]
    fn test_all_legs_execute() {
        let pool = address(100);
        let alice = address(1);
        let token = Token::new("Token", "TKN", 1_000, alice);
        let bank = NativeBank::new();
        bank.mint(alice, 50);
        token.approve(alice, pool, 100);

        Settlement::new(&token, &bank, pool)
            .execute(&[
                Leg::PullNative { from: alice, amount: 10 },
                Leg::PullToken { from: alice, amount: 100 },
                Leg::PushNative { to: alice, amount: 0 },
            ])
            .unwrap();

        assert_eq!(bank.balance_of(&pool), 10);
        assert_eq!(token.balance_of(&pool), 100);
        assert_eq!(token.balance_of(&alice), 900);
    }

    #[test]
    fn test_rejection_unwinds_executed_legs() {
        let pool = address(100);
        let alice = address(1);
        let token = Token::new("Token", "TKN", 1_000, alice);
        let bank = NativeBank::new();
        bank.mint(alice, 50);
        token.approve(alice, pool, 100);

        let err = Settlement::new(&token, &bank, pool)
            .execute(&[
                Leg::PullNative { from: alice, amount: 10 },
                // allowance only covers 100
                Leg::PullToken { from: alice, amount: 101 },
            ])
            .unwrap_err();

        assert_eq!(err, PoolError::Transfer(TransferError::InsufficientAllowance));
        assert_eq!(bank.balance_of(&alice), 50);
        assert_eq!(bank.balance_of(&pool), 0);
        assert_eq!(token.balance_of(&alice), 1_000);
    }

    #[test]
    fn test_rejected_push_unwinds_token_payout() {
        let pool = address(100);
        let alice = address(1);
        let token = Token::new("Token", "TKN", 1_000, pool);

        let err = Settlement::new(&token, &RejectingTransport, pool)
            .execute(&[
                Leg::PushToken { to: alice, amount: 40 },
                Leg::PushNative { to: alice, amount: 5 },
            ])
            .unwrap_err();

        assert!(matches!(err, PoolError::Transfer(TransferError::Rejected(_))));
        assert_eq!(token.balance_of(&pool), 1_000);
        assert_eq!(token.balance_of(&alice), 0);
    }

    #[test]
    fn test_refused_reversal_reports_divergence() {
        let pool = address(100);
        let alice = address(1);
        let token = GuardedToken::new(Token::new("Token", "TKN", 1_000, pool), pool);
        // alice cannot hand the token payout back
        token.freeze(alice);

        let err = Settlement::new(&token, &RejectingTransport, pool)
            .execute(&[
                Leg::PushToken { to: alice, amount: 40 },
                Leg::PushNative { to: alice, amount: 5 },
            ])
            .unwrap_err();

        assert_eq!(
            err,
            PoolError::Diverged(TransferError::Rejected("account frozen".to_string()))
        );
        assert_eq!(token.inner.balance_of(&alice), 40);
        assert_eq!(token.inner.balance_of(&pool), 960);
    }
}
