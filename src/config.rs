//! Configuration.
//!
//! [`PoolConfig`] is the validated value the pool itself needs (the swap fee).
//! [`Config`] is the application configuration read from the environment,
//! with `.env` support through `dotenv`.

use std::env;

use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::error::PoolResult;
use crate::math::Amount;
use crate::swap::check_fee;
use crate::utils::units::to_wei;

/// Pool parameters fixed at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Swap fee in basis points, charged on the input side
    fee_bps: u16,
}

impl PoolConfig {
    /// Creates a pool configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PoolError::InvalidFee`] unless `fee_bps < 10_000`.
    pub fn new(fee_bps: u16) -> PoolResult<Self> {
        Ok(Self {
            fee_bps: check_fee(fee_bps)?,
        })
    }

    /// Swap fee in basis points.
    #[must_use]
    pub const fn fee_bps(&self) -> u16 {
        self.fee_bps
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Pool parameters
    pub pool: PoolConfig,
    /// Name of the simulated token
    pub token_name: String,
    /// Symbol of the simulated token
    pub token_symbol: String,
    /// Initial token supply minted to the deployer, in wei
    pub token_supply: Amount,
}

impl Config {
    /// Loads `.env` (if present) and reads the configuration from the
    /// environment.
    ///
    /// # Environment Variables
    /// * `EXCHANGE_FEE_BPS` - swap fee in basis points (default `0`)
    /// * `EXCHANGE_TOKEN_NAME` - token name (default `Token`)
    /// * `EXCHANGE_TOKEN_SYMBOL` - token symbol (default `TKN`)
    /// * `EXCHANGE_TOKEN_SUPPLY` - initial supply in whole units (default `1000000`)
    ///
    /// # Errors
    /// * If a variable is set but cannot be parsed
    /// * If the fee is out of range
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    /// * If a value cannot be parsed
    /// * If the fee is out of range
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fee_bps = match lookup("EXCHANGE_FEE_BPS") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .wrap_err_with(|| format!("EXCHANGE_FEE_BPS is not a number: {raw}"))?,
            None => 0,
        };
        let pool = PoolConfig::new(fee_bps).map_err(|err| eyre!("EXCHANGE_FEE_BPS: {err}"))?;

        let token_supply = match lookup("EXCHANGE_TOKEN_SUPPLY") {
            Some(raw) => to_wei(raw.trim()).wrap_err("EXCHANGE_TOKEN_SUPPLY")?,
            None => to_wei("1000000")?,
        };

        Ok(Self {
            pool,
            token_name: lookup("EXCHANGE_TOKEN_NAME").unwrap_or_else(|| "Token".to_string()),
            token_symbol: lookup("EXCHANGE_TOKEN_SYMBOL").unwrap_or_else(|| "TKN".to_string()),
            token_supply,
        })
    }
}
