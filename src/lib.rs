/*!
 * # Exchange - Constant-Product Native/Token Pool
 *
 * A two-asset liquidity pool pairing a native asset with one fungible token.
 * Providers deposit both assets for a proportional share of the reserves and
 * redeem shares for their part of the pool; traders swap one asset for the
 * other at the price set by the reserve ratio (`x * y = k`).
 *
 * ## Core Features
 *
 * - **Exact integer pricing**: swap output, share minting and payouts round
 *   down in the pool's favour, with 256-bit intermediates
 * - **Slippage guards**: swaps reject before touching state when the output
 *   falls below the caller's minimum
 * - **All-or-nothing operations**: reserves are committed only after the
 *   asset transfers settle; rejected transfers are unwound
 * - **Serialised state**: one lock around the reserve ledger orders every
 *   deposit, withdrawal and swap
 *
 * ## Module Structure
 *
 * - `math`: Fixed-point arithmetic helpers
 * - `ledger`: Reserve ledger and transactions
 * - `liquidity`: Deposit and withdrawal pricing
 * - `swap`: Constant-product swap pricing
 * - `price`: Scaled spot price helper
 * - `assets`: Collaborator traits and settlement
 * - `exchange`: The public pool surface
 * - `token`, `native`: In-memory asset ledgers
 * - `config`: Configuration management
 * - `sim`: Scenario and stress runners
 * - `utils`: Logging, constants and unit conversion
 */

/// Collaborator traits and settlement
pub mod assets;
/// Configuration management
pub mod config;
/// Error taxonomy
pub mod error;
/// The public pool surface
pub mod exchange;
/// Reserve ledger
pub mod ledger;
/// Liquidity engine
pub mod liquidity;
/// Fixed-point arithmetic
pub mod math;
/// In-memory native asset balances
pub mod native;
/// Price query
pub mod price;
/// Scenario and stress runners
pub mod sim;
/// Swap engine
pub mod swap;
/// In-memory fungible token
pub mod token;
/// Utility functions and helpers
pub mod utils;

/// Test helpers and fixtures
#[cfg(test)]
mod test_helpers;

pub use assets::CallContext;
pub use error::{PoolError, PoolResult, TransferError};
pub use exchange::Exchange;
pub use ledger::Reserves;
pub use math::Amount;
