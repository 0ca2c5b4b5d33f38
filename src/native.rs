//! In-memory native asset balances.
//!
//! Stands in for the execution environment's native balances: value attached
//! to a call and payouts to recipients both go through [`NativeBank::send`].

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use alloy::primitives::Address;

use crate::assets::NativeTransport;
use crate::error::TransferError;
use crate::math::Amount;

/// Native balances held in memory.
#[derive(Debug, Default)]
pub struct NativeBank {
    /// Account balances
    balances: RwLock<HashMap<Address, Amount>>,
}

impl NativeBank {
    /// Creates a bank with no balances.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` to `account` out of thin air (genesis funding).
    pub fn mint(&self, account: Address, amount: Amount) {
        let mut balances = self.balances.write().unwrap_or_else(PoisonError::into_inner);
        let balance = balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Balance of `account`.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(account)
            .copied()
            .unwrap_or_default()
    }
}

impl NativeTransport for NativeBank {
    fn send(&self, from: Address, to: Address, amount: Amount) -> Result<(), TransferError> {
        let mut balances = self.balances.write().unwrap_or_else(PoisonError::into_inner);
        let from_balance = balances.get(&from).copied().unwrap_or_default();
        let remaining = from_balance
            .checked_sub(amount)
            .ok_or(TransferError::InsufficientBalance)?;
        if from == to {
            return Ok(());
        }
        let to_balance = balances.get(&to).copied().unwrap_or_default();
        let credited = to_balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected("balance overflow".to_string()))?;
        balances.insert(from, remaining);
        balances.insert(to, credited);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_helpers::address;

    #[test]
    fn test_send() {
        let bank = NativeBank::new();
        let (alice, bob) = (address(1), address(2));
        bank.mint(alice, 10);

        bank.send(alice, bob, 4).unwrap();
        assert_eq!(bank.balance_of(&alice), 6);
        assert_eq!(bank.balance_of(&bob), 4);

        assert_eq!(bank.send(bob, alice, 5), Err(TransferError::InsufficientBalance));
        assert_eq!(bank.balance_of(&bob), 4);
    }
}
