//! # Simulation
//!
//! Drives an [`Exchange`](crate::exchange::Exchange) wired to the in-memory
//! ledgers. Used by the command-line tool and by tests.

use std::sync::Arc;

use alloy::primitives::{keccak256, Address};

use crate::config::Config;
use crate::exchange::Exchange;
use crate::native::NativeBank;
use crate::token::Token;

/// Scripted scenarios read from JSON
pub mod scenario;
/// Concurrent swap load against one pool
pub mod stress;

/// An exchange and the in-memory ledgers behind it.
pub struct Market {
    /// The pool
    pub exchange: Arc<Exchange<Token, NativeBank>>,
    /// Token ledger
    pub token: Arc<Token>,
    /// Native balances
    pub bank: Arc<NativeBank>,
    /// Holder of the initial token supply
    pub deployer: Address,
}

impl Market {
    /// Deploys a token and an empty exchange as described by `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let deployer = account("deployer");
        let token = Arc::new(Token::new(
            &config.token_name,
            &config.token_symbol,
            config.token_supply,
            deployer,
        ));
        let bank = Arc::new(NativeBank::new());
        let exchange = Arc::new(Exchange::new(
            account("exchange"),
            Arc::clone(&token),
            Arc::clone(&bank),
            config.pool,
        ));
        Self {
            exchange,
            token,
            bank,
            deployer,
        }
    }
}

/// Deterministic address for a named account.
#[must_use]
pub fn account(name: &str) -> Address {
    Address::from_slice(&keccak256(name.as_bytes())[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_is_stable() {
        assert_eq!(account("alice"), account("alice"));
        assert_ne!(account("alice"), account("bob"));
    }
}
