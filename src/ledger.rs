//! # Reserve Ledger
//!
//! The authoritative record of the pool: both reserves, the total number of
//! outstanding shares and every provider's position. State sits behind a
//! single [`RwLock`]. Reads take the read lock and return a [`Reserves`]
//! snapshot; state-changing operations hold a [`LedgerTxn`] (the write lock)
//! from their first read until [`LedgerTxn::commit`], so no other operation
//! can interleave between reading reserves and committing against them.
//!
//! The ledger performs no validation. Callers build the complete new state
//! first and commit it in one step.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::math::{product, Amount};

/// A consistent view of the pool's balances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reserves {
    /// Native asset held by the pool
    pub native: Amount,
    /// Token asset held by the pool
    pub token: Amount,
    /// Shares outstanding across all providers
    pub total_shares: Amount,
}

impl Reserves {
    /// Creates a reserves value.
    #[must_use]
    pub const fn new(native: Amount, token: Amount, total_shares: Amount) -> Self {
        Self {
            native,
            token,
            total_shares,
        }
    }

    /// `true` when the pool holds nothing and has no shares outstanding.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_shares == 0
    }

    /// The pool is either fully empty or fully funded.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        let native_empty = self.native == 0;
        native_empty == (self.token == 0) && native_empty == (self.total_shares == 0)
    }

    /// Product of the two reserves (`k` of the constant-product curve).
    #[must_use]
    pub fn product(&self) -> U256 {
        product(self.native, self.token)
    }
}

impl Display for Reserves {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reserves({} native / {} token, {} shares)",
            self.native, self.token, self.total_shares
        )
    }
}

/// Change to a single provider's position, applied together with new reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionUpdate {
    /// Owner of the position
    pub provider: Address,
    /// Share count after the operation; zero removes the position
    pub shares: Amount,
}

/// Everything the lock protects.
#[derive(Debug, Default)]
struct LedgerState {
    /// Pool balances
    reserves: Reserves,
    /// Shares per provider; sums to `reserves.total_shares`
    positions: HashMap<Address, Amount>,
}

/// Shared, lock-protected pool state.
#[derive(Debug, Default)]
pub struct ReserveLedger {
    /// Single serialisation point for every operation
    state: RwLock<LedgerState>,
}

impl ReserveLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the reserves.
    ///
    /// The snapshot is taken under the read lock, so it never mixes fields
    /// from before and after a concurrent commit.
    pub fn read(&self) -> Reserves {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .reserves
    }

    /// Returns the share count held by `provider`.
    pub fn position(&self, provider: &Address) -> Amount {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .positions
            .get(provider)
            .copied()
            .unwrap_or_default()
    }

    /// Opens a transaction holding the write lock until it is committed or
    /// dropped.
    ///
    /// Poisoning is recovered: state is written only by [`LedgerTxn::commit`]
    /// which assigns plain values, so a panic elsewhere cannot leave it half
    /// updated.
    pub fn transaction(&self) -> LedgerTxn<'_> {
        LedgerTxn {
            guard: self.state.write().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

/// Exclusive access to the ledger for one read-compute-commit cycle.
///
/// Dropping a transaction without calling [`LedgerTxn::commit`] leaves the
/// ledger unchanged.
pub struct LedgerTxn<'a> {
    /// Write guard held for the lifetime of the transaction
    guard: RwLockWriteGuard<'a, LedgerState>,
}

impl LedgerTxn<'_> {
    /// Reserves as of the start of the transaction.
    #[must_use]
    pub fn reserves(&self) -> Reserves {
        self.guard.reserves
    }

    /// Share count held by `provider`.
    #[must_use]
    pub fn position(&self, provider: &Address) -> Amount {
        self.guard
            .positions
            .get(provider)
            .copied()
            .unwrap_or_default()
    }

    /// Applies new reserves and, optionally, one provider's new position.
    pub fn commit(mut self, reserves: Reserves, position: Option<PositionUpdate>) {
        self.guard.reserves = reserves;
        if let Some(update) = position {
            if update.shares == 0 {
                self.guard.positions.remove(&update.provider);
            } else {
                self.guard.positions.insert(update.provider, update.shares);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_helpers::address;

    #[test]
    fn test_consistency() {
        assert!(Reserves::default().is_consistent());
        assert!(Reserves::new(10, 200, 10).is_consistent());
        assert!(!Reserves::new(10, 0, 10).is_consistent());
        assert!(!Reserves::new(0, 0, 1).is_consistent());
    }

    #[test]
    fn test_commit_and_read() {
        let ledger = ReserveLedger::new();
        let alice = address(1);

        let txn = ledger.transaction();
        assert_eq!(txn.reserves(), Reserves::default());
        txn.commit(
            Reserves::new(10, 200, 10),
            Some(PositionUpdate {
                provider: alice,
                shares: 10,
            }),
        );

        assert_eq!(ledger.read(), Reserves::new(10, 200, 10));
        assert_eq!(ledger.position(&alice), 10);
    }

    #[test]
    fn test_dropped_transaction_is_discarded() {
        let ledger = ReserveLedger::new();
        {
            let txn = ledger.transaction();
            assert!(txn.reserves().is_empty());
        }
        assert_eq!(ledger.read(), Reserves::default());
    }

    #[test]
    fn test_zero_position_is_removed() {
        let ledger = ReserveLedger::new();
        let alice = address(1);
        ledger.transaction().commit(
            Reserves::new(5, 5, 5),
            Some(PositionUpdate {
                provider: alice,
                shares: 5,
            }),
        );
        ledger.transaction().commit(
            Reserves::default(),
            Some(PositionUpdate {
                provider: alice,
                shares: 0,
            }),
        );
        assert_eq!(ledger.position(&alice), 0);
        let state = ledger.state.read().unwrap_or_else(PoisonError::into_inner);
        assert!(state.positions.is_empty());
    }

    #[test]
    fn test_snapshots_are_never_torn() {
        let ledger = Arc::new(ReserveLedger::new());
        let writer = {
            let ledger = Arc::clone(&ledger);
            std::thread::spawn(move || {
                for i in 1..=1_000 {
                    ledger
                        .transaction()
                        .commit(Reserves::new(i, i * 2, i), None);
                }
            })
        };
        for _ in 0..1_000 {
            let snapshot = ledger.read();
            assert_eq!(snapshot.token, snapshot.native * 2);
            assert_eq!(snapshot.total_shares, snapshot.native);
        }
        writer.join().unwrap();
    }
}
