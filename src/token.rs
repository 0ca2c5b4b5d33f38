//! In-memory fungible token.
//!
//! A plain balances-and-allowances ledger with the usual surface (`name`,
//! `symbol`, `total_supply`, `balance_of`, `approve`, `allowance`, `transfer`,
//! `transfer_from`). The whole initial supply is minted to the deployer.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use alloy::primitives::Address;

use crate::assets::TokenLedger;
use crate::error::TransferError;
use crate::math::Amount;

/// Balances and allowances behind one lock.
#[derive(Debug, Default)]
struct Books {
    /// Holder balances
    balances: HashMap<Address, Amount>,
    /// `(owner, spender) -> remaining allowance`
    allowances: HashMap<(Address, Address), Amount>,
}

impl Books {
    /// Debits `from` and credits `to`, or changes nothing.
    fn move_balance(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let from_balance = self.balances.get(&from).copied().unwrap_or_default();
        let remaining = from_balance
            .checked_sub(amount)
            .ok_or(TransferError::InsufficientBalance)?;
        let to_balance = self.balances.get(&to).copied().unwrap_or_default();
        if from != to {
            let credited = to_balance
                .checked_add(amount)
                .ok_or_else(|| TransferError::Rejected("balance overflow".to_string()))?;
            self.balances.insert(to, credited);
            self.balances.insert(from, remaining);
        }
        Ok(())
    }
}

/// A fungible token held in memory.
#[derive(Debug)]
pub struct Token {
    /// Display name
    name: String,
    /// Ticker
    symbol: String,
    /// Fixed supply minted at creation
    total_supply: Amount,
    /// Mutable ledger state
    books: RwLock<Books>,
}

impl Token {
    /// Creates a token and mints `initial_supply` to `deployer`.
    #[must_use]
    pub fn new(name: &str, symbol: &str, initial_supply: Amount, deployer: Address) -> Self {
        let mut books = Books::default();
        books.balances.insert(deployer, initial_supply);
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            total_supply: initial_supply,
            books: RwLock::new(books),
        }
    }

    /// Token name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Total supply.
    #[must_use]
    pub const fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Balance held by `owner`.
    pub fn balance_of(&self, owner: &Address) -> Amount {
        self.books
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .balances
            .get(owner)
            .copied()
            .unwrap_or_default()
    }

    /// Remaining amount `spender` may move out of `owner`'s balance.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.books
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    /// Sets the allowance of `spender` over `owner`'s balance to `amount`.
    pub fn approve(&self, owner: Address, spender: Address, amount: Amount) {
        self.books
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .allowances
            .insert((owner, spender), amount);
    }
}

impl TokenLedger for Token {
    fn transfer_from(
        &self,
        spender: Address,
        owner: Address,
        recipient: Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let mut books = self.books.write().unwrap_or_else(PoisonError::into_inner);
        let allowed = books
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default();
        let remaining = allowed
            .checked_sub(amount)
            .ok_or(TransferError::InsufficientAllowance)?;
        books.move_balance(owner, recipient, amount)?;
        books.allowances.insert((owner, spender), remaining);
        Ok(())
    }

    fn transfer(
        &self,
        sender: Address,
        recipient: Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.books
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .move_balance(sender, recipient, amount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_helpers::address;

    #[test]
    fn test_name_and_symbol() {
        let token = Token::new("Token", "TKN", 31_337, address(1));
        assert_eq!(token.name(), "Token");
        assert_eq!(token.symbol(), "TKN");
    }

    #[test]
    fn test_initial_supply_minted_to_deployer() {
        let owner = address(1);
        let token = Token::new("Token", "TKN", 31_337, owner);
        assert_eq!(token.total_supply(), 31_337);
        assert_eq!(token.balance_of(&owner), 31_337);
        assert_eq!(token.balance_of(&address(2)), 0);
    }

    #[test]
    fn test_transfer() {
        let (owner, user) = (address(1), address(2));
        let token = Token::new("Token", "TKN", 100, owner);
        token.transfer(owner, user, 40).unwrap();
        assert_eq!(token.balance_of(&owner), 60);
        assert_eq!(token.balance_of(&user), 40);
        assert_eq!(
            token.transfer(user, owner, 41),
            Err(TransferError::InsufficientBalance)
        );
        assert_eq!(token.balance_of(&user), 40);
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let owner = address(1);
        let token = Token::new("Token", "TKN", 100, owner);
        token.transfer(owner, owner, 100).unwrap();
        assert_eq!(token.balance_of(&owner), 100);
    }

    #[test]
    fn test_transfer_from_spends_allowance() {
        let (owner, spender, user) = (address(1), address(2), address(3));
        let token = Token::new("Token", "TKN", 100, owner);
        token.approve(owner, spender, 30);

        token.transfer_from(spender, owner, user, 20).unwrap();
        assert_eq!(token.allowance(&owner, &spender), 10);
        assert_eq!(token.balance_of(&user), 20);

        assert_eq!(
            token.transfer_from(spender, owner, user, 11),
            Err(TransferError::InsufficientAllowance)
        );
    }

    #[test]
    fn test_failed_transfer_from_keeps_allowance() {
        let (owner, spender) = (address(1), address(2));
        let token = Token::new("Token", "TKN", 5, owner);
        token.approve(owner, spender, 10);
        assert_eq!(
            token.transfer_from(spender, owner, spender, 6),
            Err(TransferError::InsufficientBalance)
        );
        assert_eq!(token.allowance(&owner, &spender), 10);
        assert_eq!(token.balance_of(&owner), 5);
    }
}
