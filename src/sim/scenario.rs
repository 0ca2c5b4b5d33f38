//! Scripted scenarios.
//!
//! A scenario is a JSON document naming some funded accounts and a list of
//! steps run in order against a fresh [`Market`]. Amounts are decimal strings
//! in whole units (`"1.8"` is 1.8e18 wei). A step may declare the error it
//! expects; any other failure stops the run.
//!
//! ```json
//! {
//!   "accounts": { "bob": { "native": "5" } },
//!   "steps": [
//!     { "op": "approve", "account": "deployer", "amount": "20" },
//!     { "op": "add_liquidity", "account": "deployer", "native": "10", "token": "20" },
//!     { "op": "swap", "account": "bob", "direction": "native_to_token",
//!       "amount": "1", "min_out": "2", "expect_error": "insufficient output amount" }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use alloy::primitives::Address;
use eyre::{bail, eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};

use super::{account, Market};
use crate::assets::{CallContext, TokenLedger};
use crate::config::{Config, PoolConfig};
use crate::error::PoolError;
use crate::math::Amount;
use crate::swap::{SwapDirection, SwapRequest};
use crate::utils::units::{from_wei, to_wei};

/// An amount written in whole units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Units(pub Amount);

impl TryFrom<String> for Units {
    type Error = eyre::Report;

    fn try_from(value: String) -> Result<Self> {
        to_wei(&value).map(Self)
    }
}

/// Starting balances of a named account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Funding {
    /// Native balance minted to the account
    #[serde(default)]
    pub native: Units,
    /// Tokens transferred from the deployer
    #[serde(default)]
    pub token: Units,
}

/// One operation of a scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    /// Credit an account, registering it if new
    Fund {
        /// Account name
        account: String,
        /// Native minted
        #[serde(default)]
        native: Units,
        /// Tokens transferred from the deployer
        #[serde(default)]
        token: Units,
    },
    /// Let the exchange pull up to `amount` tokens from `account`
    Approve {
        /// Token holder
        account: String,
        /// New allowance
        amount: Units,
    },
    /// Deposit liquidity
    AddLiquidity {
        /// Provider
        account: String,
        /// Native value attached
        native: Units,
        /// Maximum tokens offered
        token: Units,
    },
    /// Redeem shares
    RemoveLiquidity {
        /// Provider
        account: String,
        /// Shares burned
        shares: Units,
    },
    /// Swap through the pool
    Swap {
        /// Payer
        account: String,
        /// Which asset goes in
        direction: SwapDirection,
        /// Input amount
        amount: Units,
        /// Slippage bound
        #[serde(default)]
        min_out: Units,
        /// Receiver of the output, the payer if absent
        #[serde(default)]
        recipient: Option<String>,
    },
    /// Check the pool's reserves
    ExpectReserves {
        /// Expected native reserve
        native: Units,
        /// Expected token reserve
        token: Units,
        /// Expected shares outstanding, unchecked if absent
        #[serde(default)]
        shares: Option<Units>,
    },
}

/// An action and the error it is expected to fail with, if any.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// The operation
    #[serde(flatten)]
    pub action: Action,
    /// Message of the expected [`PoolError`]
    #[serde(default)]
    pub expect_error: Option<String>,
}

/// A complete scenario file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scenario {
    /// Swap fee override in basis points
    #[serde(default)]
    pub fee_bps: Option<u16>,
    /// Accounts funded before the first step
    #[serde(default)]
    pub accounts: BTreeMap<String, Funding>,
    /// Steps run in order
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Reads a scenario from a JSON file.
    ///
    /// # Errors
    /// * If the file cannot be read
    /// * If the JSON does not describe a scenario
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .wrap_err_with(|| format!("reading scenario {}", path.display()))?;
        Self::parse(&raw).wrap_err_with(|| format!("parsing scenario {}", path.display()))
    }

    /// Parses a scenario from JSON text.
    ///
    /// # Errors
    /// * If the JSON does not describe a scenario
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// What happened at one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Position in the scenario, starting at 1
    pub index: usize,
    /// Human-readable outcome
    pub outcome: String,
}

/// Balances of one account at the end of a run, in whole units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountReport {
    /// Native balance
    pub native: String,
    /// Token balance
    pub token: String,
    /// Pool shares held
    pub shares: String,
}

/// Result of a complete run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Swap fee the pool ran with, in basis points
    pub fee_bps: u16,
    /// Outcome of every step
    pub steps: Vec<StepReport>,
    /// Native reserve at the end
    pub native_reserve: String,
    /// Token reserve at the end
    pub token_reserve: String,
    /// Shares outstanding at the end
    pub total_shares: String,
    /// Final balances of every named account
    pub accounts: BTreeMap<String, AccountReport>,
}

/// Runs `scenario` against a fresh market configured by `config`.
///
/// # Errors
/// * If funding an account fails
/// * If a step fails without declaring that error, or succeeds when one was expected
/// * If an `expect_reserves` check does not hold
pub fn run(scenario: &Scenario, config: &Config) -> Result<ScenarioReport> {
    let mut config = config.clone();
    if let Some(fee_bps) = scenario.fee_bps {
        config.pool = PoolConfig::new(fee_bps).map_err(|err| eyre!("fee_bps: {err}"))?;
    }
    let market = Market::new(&config);

    let mut names: BTreeMap<String, Address> = BTreeMap::new();
    names.insert("deployer".to_string(), market.deployer);
    for (name, funding) in &scenario.accounts {
        fund(&market, &mut names, name, funding.native.0, funding.token.0)
            .map_err(|err| eyre!("funding {name}: {err}"))?;
    }

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (offset, step) in scenario.steps.iter().enumerate() {
        let index = offset + 1;
        let outcome = match (apply(&market, &mut names, &step.action), &step.expect_error) {
            (Ok(outcome), None) => outcome,
            (Ok(outcome), Some(expected)) => {
                bail!("step {index}: expected \"{expected}\" but succeeded ({outcome})")
            }
            (Err(StepError::Pool(err)), Some(expected)) if err.to_string() == *expected => {
                format!("rejected as expected: {err}")
            }
            (Err(StepError::Pool(err)), _) => bail!("step {index}: {err}"),
            (Err(StepError::Script(err)), _) => return Err(err.wrap_err(format!("step {index}"))),
        };
        log::info!("scenario: step {index}: {outcome}");
        steps.push(StepReport { index, outcome });
    }

    let reserves = market.exchange.snapshot();
    let accounts = names
        .iter()
        .map(|(name, address)| {
            (
                name.clone(),
                AccountReport {
                    native: from_wei(market.bank.balance_of(address)),
                    token: from_wei(market.token.balance_of(address)),
                    shares: from_wei(market.exchange.shares_of(address)),
                },
            )
        })
        .collect();

    Ok(ScenarioReport {
        fee_bps: market.exchange.config().fee_bps(),
        steps,
        native_reserve: from_wei(reserves.native),
        token_reserve: from_wei(reserves.token),
        total_shares: from_wei(reserves.total_shares),
        accounts,
    })
}

/// Why a step did not succeed.
enum StepError {
    /// The pool rejected the operation
    Pool(PoolError),
    /// The script itself is wrong (unknown account, failed check)
    Script(eyre::Report),
}

impl From<PoolError> for StepError {
    fn from(err: PoolError) -> Self {
        Self::Pool(err)
    }
}

/// Credits `name` from genesis (native) and the deployer (token).
fn fund(
    market: &Market,
    names: &mut BTreeMap<String, Address>,
    name: &str,
    native: Amount,
    token: Amount,
) -> Result<(), PoolError> {
    let address = *names.entry(name.to_string()).or_insert_with(|| account(name));
    market.token.transfer(market.deployer, address, token)?;
    market.bank.mint(address, native);
    Ok(())
}

/// Resolves a named account.
fn lookup(names: &BTreeMap<String, Address>, name: &str) -> Result<Address, StepError> {
    names
        .get(name)
        .copied()
        .ok_or_else(|| StepError::Script(eyre!("unknown account {name}")))
}

/// Performs one action and describes its result.
fn apply(
    market: &Market,
    names: &mut BTreeMap<String, Address>,
    action: &Action,
) -> Result<String, StepError> {
    let exchange = &market.exchange;
    match action {
        Action::Fund { account, native, token } => {
            fund(market, names, account, native.0, token.0)?;
            Ok(format!(
                "{account} funded with {} native + {} token",
                from_wei(native.0),
                from_wei(token.0)
            ))
        }
        Action::Approve { account, amount } => {
            let holder = lookup(names, account)?;
            market.token.approve(holder, exchange.address(), amount.0);
            Ok(format!("{account} approved {}", from_wei(amount.0)))
        }
        Action::AddLiquidity { account, native, token } => {
            let provider = lookup(names, account)?;
            let shares =
                exchange.add_liquidity(CallContext::with_value(provider, native.0), token.0)?;
            Ok(format!("{account} minted {} shares", from_wei(shares)))
        }
        Action::RemoveLiquidity { account, shares } => {
            let provider = lookup(names, account)?;
            let (native_out, token_out) =
                exchange.remove_liquidity(CallContext::new(provider), shares.0)?;
            Ok(format!(
                "{account} received {} native + {} token",
                from_wei(native_out),
                from_wei(token_out)
            ))
        }
        Action::Swap {
            account,
            direction,
            amount,
            min_out,
            recipient,
        } => {
            let payer = lookup(names, account)?;
            let to = match recipient {
                Some(name) => lookup(names, name)?,
                None => payer,
            };
            let amount_out = match direction {
                SwapDirection::NativeToToken => exchange.eth_to_token_transfer(
                    CallContext::with_value(payer, amount.0),
                    min_out.0,
                    to,
                )?,
                SwapDirection::TokenToNative if to == payer => {
                    exchange.token_to_eth_swap(CallContext::new(payer), amount.0, min_out.0)?
                }
                SwapDirection::TokenToNative => {
                    let request = SwapRequest {
                        input_amount: amount.0,
                        direction: *direction,
                        minimum_output: min_out.0,
                    };
                    exchange.swap(payer, &request, to)?.amount_out
                }
            };
            Ok(format!(
                "{account} swapped {} {direction} for {}",
                from_wei(amount.0),
                from_wei(amount_out)
            ))
        }
        Action::ExpectReserves { native, token, shares } => {
            let reserves = exchange.snapshot();
            let shares_ok = shares.map_or(true, |shares| shares.0 == reserves.total_shares);
            if reserves.native != native.0 || reserves.token != token.0 || !shares_ok {
                return Err(StepError::Script(eyre!(
                    "reserves are {} native / {} token / {} shares",
                    from_wei(reserves.native),
                    from_wei(reserves.token),
                    from_wei(reserves.total_shares)
                )));
            }
            Ok(format!(
                "reserves {} native / {} token",
                from_wei(reserves.native),
                from_wei(reserves.token)
            ))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    fn config() -> Config {
        Config::from_lookup(|_| None).unwrap()
    }

    #[test]
    fn test_bundled_scenario() {
        let scenario = Scenario::parse(include_str!("../../scenarios/exchange.json")).unwrap();
        let report = run(&scenario, &config()).unwrap();

        assert_eq!(report.steps.len(), scenario.steps.len());
        assert_eq!(report.fee_bps, 0);
        assert_eq!(report.native_reserve, "0");
        assert_eq!(report.token_reserve, "0");
        assert_eq!(report.total_shares, "0");
        assert_eq!(report.accounts["bob"].token, "1.818181818181818181");
        assert_eq!(report.accounts["bob"].native, "4");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "steps": [
                {{ "op": "approve", "account": "deployer", "amount": "200" }},
                {{ "op": "add_liquidity", "account": "deployer", "native": "0", "token": "200",
                   "expect_error": "invalid amount" }},
                {{ "op": "expect_reserves", "native": "0", "token": "0", "shares": "0" }}
            ] }}"#
        )
        .unwrap();

        let scenario = Scenario::load(file.path()).unwrap();
        let report = run(&scenario, &config()).unwrap();
        assert_eq!(report.steps[1].outcome, "rejected as expected: invalid amount");
    }

    #[test]
    fn test_fund_and_pay_recipient() {
        let scenario = Scenario::parse(
            r#"{ "steps": [
                { "op": "fund", "account": "deployer", "native": "10" },
                { "op": "approve", "account": "deployer", "amount": "20" },
                { "op": "add_liquidity", "account": "deployer", "native": "10", "token": "20" },
                { "op": "fund", "account": "carol", "token": "2" },
                { "op": "approve", "account": "carol", "amount": "2" },
                { "op": "swap", "account": "carol", "direction": "token_to_native", "amount": "2",
                  "recipient": "deployer" }
            ] }"#,
        )
        .unwrap();
        let report = run(&scenario, &config()).unwrap();

        assert_eq!(report.accounts["carol"].token, "0");
        assert_eq!(report.accounts["carol"].native, "0");
        assert_eq!(report.accounts["deployer"].native, "0.90909090909090909");
        assert_eq!(report.native_reserve, "9.09090909090909091");
    }

    #[test]
    fn test_unexpected_failure_stops_run() {
        let scenario = Scenario::parse(
            r#"{ "steps": [
                { "op": "swap", "account": "deployer", "direction": "native_to_token",
                  "amount": "1" }
            ] }"#,
        )
        .unwrap();
        let err = run(&scenario, &config()).unwrap_err();
        assert_eq!(err.to_string(), "step 1: invalid amount");
    }

    #[test]
    fn test_failed_reserve_check() {
        let scenario = Scenario::parse(
            r#"{ "steps": [ { "op": "expect_reserves", "native": "1", "token": "1" } ] }"#,
        )
        .unwrap();
        assert!(run(&scenario, &config()).is_err());
    }

    #[test]
    fn test_unknown_account() {
        let scenario = Scenario::parse(
            r#"{ "steps": [ { "op": "approve", "account": "mallory", "amount": "1" } ] }"#,
        )
        .unwrap();
        assert!(run(&scenario, &config()).is_err());
    }

    #[test]
    fn test_bad_amount_is_a_parse_error() {
        assert!(Scenario::parse(
            r#"{ "steps": [ { "op": "approve", "account": "deployer", "amount": "lots" } ] }"#
        )
        .is_err());
    }
}
