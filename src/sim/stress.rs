//! Concurrent swap load.
//!
//! Seeds a pool, funds a set of traders and lets them swap in random
//! directions from parallel workers. Afterwards the pool must still satisfy
//! its invariants: the reserve product has not decreased, reserves and shares
//! agree, and the pool's balances on both ledgers equal its reserves.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use eyre::{bail, eyre, Result};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use serde::Serialize;

use super::{account, Market};
use crate::assets::{CallContext, TokenLedger};
use crate::config::Config;
use crate::exchange::Exchange;
use crate::math::Amount;
use crate::native::NativeBank;
use crate::token::Token;
use crate::utils::constants::WEI_PER_UNIT;
use crate::utils::units::from_wei;

/// Parameters of a stress run.
#[derive(Debug, Clone, Copy)]
pub struct StressOptions {
    /// Number of concurrent workers, one trader each
    pub tasks: usize,
    /// Swaps performed by every worker
    pub swaps_per_task: usize,
    /// Largest single swap input, in wei
    pub max_swap: Amount,
    /// Native liquidity seeded before trading
    pub liquidity_native: Amount,
    /// Token liquidity seeded before trading
    pub liquidity_token: Amount,
    /// Seed of the first worker's generator
    pub seed: u64,
    /// Draw a progress bar on stderr
    pub progress: bool,
}

impl Default for StressOptions {
    fn default() -> Self {
        Self {
            tasks: 8,
            swaps_per_task: 100,
            max_swap: WEI_PER_UNIT,
            liquidity_native: 1_000 * WEI_PER_UNIT,
            liquidity_token: 2_000 * WEI_PER_UNIT,
            seed: 7,
            progress: false,
        }
    }
}

/// Outcome of a stress run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StressReport {
    /// Swaps that settled
    pub executed: usize,
    /// Swaps the pool rejected
    pub rejected: usize,
    /// Native reserve after trading
    pub native_reserve: String,
    /// Token reserve after trading
    pub token_reserve: String,
    /// Reserve product before trading
    pub initial_product: String,
    /// Reserve product after trading
    pub final_product: String,
}

/// Swap counts of one worker.
#[derive(Debug, Default, Clone, Copy)]
struct WorkerStats {
    /// Settled swaps
    executed: usize,
    /// Rejected swaps
    rejected: usize,
}

/// Runs the load described by `options` against a fresh market.
///
/// # Errors
/// * If seeding liquidity or funding a trader fails
/// * If a worker panics
/// * If any invariant is violated after trading
pub async fn run(options: StressOptions, config: &Config) -> Result<StressReport> {
    if options.tasks == 0 || options.max_swap == 0 {
        bail!("stress run needs at least one task and a non-zero max swap");
    }
    let market = Market::new(config);
    let exchange = Arc::clone(&market.exchange);

    market.bank.mint(market.deployer, options.liquidity_native);
    market
        .token
        .approve(market.deployer, exchange.address(), options.liquidity_token);
    exchange
        .add_liquidity(
            CallContext::with_value(market.deployer, options.liquidity_native),
            options.liquidity_token,
        )
        .map_err(|err| eyre!("seeding liquidity: {err}"))?;

    let budget = options
        .max_swap
        .checked_mul(options.swaps_per_task as Amount)
        .ok_or_else(|| eyre!("trader budget overflows"))?;
    let traders: Vec<Address> = (0..options.tasks)
        .map(|i| account(&format!("trader-{i}")))
        .collect();
    for trader in &traders {
        market.bank.mint(*trader, budget);
        market
            .token
            .transfer(market.deployer, *trader, budget)
            .map_err(|err| eyre!("funding {trader}: {err}"))?;
        market.token.approve(*trader, exchange.address(), Amount::MAX);
    }

    let initial = exchange.snapshot();
    info!(
        "stress: {} tasks x {} swaps against {initial}",
        options.tasks, options.swaps_per_task
    );

    let progress = progress_bar(&options)?;
    let handles = traders.into_iter().zip(0_u64..).map(|(trader, offset)| {
        let exchange = Arc::clone(&exchange);
        let progress = progress.clone();
        let seed = options.seed.wrapping_add(offset);
        tokio::task::spawn_blocking(move || {
            trade(&exchange, trader, seed, &options, &progress)
        })
    });
    let results = join_all(handles).await;
    progress.finish_and_clear();

    let mut executed = 0;
    let mut rejected = 0;
    for stats in results {
        let stats = stats?;
        executed += stats.executed;
        rejected += stats.rejected;
    }

    let reserves = exchange.snapshot();
    let (initial_product, final_product) = (initial.product(), reserves.product());
    check_invariants(&market, initial_product)?;
    info!("stress: {executed} swaps settled, {rejected} rejected, {reserves}");

    Ok(StressReport {
        executed,
        rejected,
        native_reserve: from_wei(reserves.native),
        token_reserve: from_wei(reserves.token),
        initial_product: initial_product.to_string(),
        final_product: final_product.to_string(),
    })
}

/// Progress bar over all swaps, hidden unless requested.
fn progress_bar(options: &StressOptions) -> Result<ProgressBar> {
    if !options.progress {
        return Ok(ProgressBar::hidden());
    }
    let total = options.tasks.saturating_mul(options.swaps_per_task) as u64;
    let bar = ProgressBar::new(total);
    bar.set_style(ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} swaps",
    )?);
    Ok(bar)
}

/// One worker's swap loop.
fn trade(
    exchange: &Exchange<Token, NativeBank>,
    trader: Address,
    seed: u64,
    options: &StressOptions,
    progress: &ProgressBar,
) -> WorkerStats {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut stats = WorkerStats::default();

    for _ in 0..options.swaps_per_task {
        let amount = rng.u128(1..=options.max_swap);
        let result = if rng.bool() {
            exchange.eth_to_token_swap(CallContext::with_value(trader, amount), 0)
        } else {
            exchange.token_to_eth_swap(CallContext::new(trader), amount, 0)
        };
        match result {
            Ok(_) => stats.executed += 1,
            Err(err) => {
                debug!("stress: {trader} swap of {amount} rejected: {err}");
                stats.rejected += 1;
            }
        }
        progress.inc(1);
    }
    stats
}

/// Verifies the pool after trading.
fn check_invariants(market: &Market, initial_product: U256) -> Result<()> {
    let reserves = market.exchange.snapshot();
    let pool = market.exchange.address();

    if reserves.product() < initial_product {
        bail!(
            "reserve product decreased from {initial_product} to {}",
            reserves.product()
        );
    }
    if !reserves.is_consistent() {
        bail!("inconsistent reserves {reserves}");
    }
    let native_held = market.exchange.native().balance_of(&pool);
    if native_held != reserves.native {
        bail!("pool holds {native_held} native but reserves say {}", reserves.native);
    }
    let token_held = market.exchange.token().balance_of(&pool);
    if token_held != reserves.token {
        bail!("pool holds {token_held} token but reserves say {}", reserves.token);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::from_lookup(|_| None).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_invariants_hold_under_load() {
        let options = StressOptions {
            tasks: 4,
            swaps_per_task: 50,
            ..StressOptions::default()
        };
        let report = run(options, &config()).await.unwrap();

        assert_eq!(report.executed + report.rejected, 200);
        assert_eq!(report.rejected, 0);
        let initial: U256 = report.initial_product.parse().unwrap();
        let final_product: U256 = report.final_product.parse().unwrap();
        assert!(final_product >= initial);
    }

    #[tokio::test]
    async fn test_with_fee() {
        let config =
            Config::from_lookup(|key| (key == "EXCHANGE_FEE_BPS").then(|| "30".to_string()))
                .unwrap();
        let options = StressOptions {
            tasks: 2,
            swaps_per_task: 20,
            ..StressOptions::default()
        };
        let report = run(options, &config).await.unwrap();
        let initial: U256 = report.initial_product.parse().unwrap();
        let final_product: U256 = report.final_product.parse().unwrap();
        assert!(final_product > initial);
    }

    #[tokio::test]
    async fn test_rejects_empty_load() {
        let options = StressOptions {
            tasks: 0,
            ..StressOptions::default()
        };
        assert!(run(options, &config()).await.is_err());
    }
}
