use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::{eyre, Error, Result};
use log::info;
use serde_json::json;

use exchange::config::Config;
use exchange::ledger::Reserves;
use exchange::price::get_price;
use exchange::sim::scenario::{self, Scenario};
use exchange::sim::stress::{self, StressOptions};
use exchange::swap::{self, SwapDirection, SwapRequest};
use exchange::utils::logger::setup_logger;
use exchange::utils::units::{from_wei, to_wei};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote a swap against the given reserves (amounts in whole units)
    Quote {
        #[arg(long)]
        native_reserve: String,
        #[arg(long)]
        token_reserve: String,
        #[arg(long)]
        amount: String,
        /// Sell tokens for the native asset instead
        #[arg(long)]
        reverse: bool,
    },
    /// Scaled price of A in terms of B (x1000)
    Price {
        #[arg(long)]
        reserve_a: u128,
        #[arg(long)]
        reserve_b: u128,
    },
    /// Run a JSON scenario and print the final state
    Scenario { file: PathBuf },
    /// Swap concurrently against one pool and check its invariants
    Stress {
        #[arg(long, default_value_t = 8)]
        tasks: usize,
        #[arg(long, default_value_t = 100)]
        swaps: usize,
        /// Largest single swap, in whole units
        #[arg(long, default_value = "1")]
        max_swap: String,
        #[arg(long, default_value_t = 7)]
        seed: u64,
    },
}

fn quote(
    config: &Config,
    native_reserve: &str,
    token_reserve: &str,
    amount: &str,
    reverse: bool,
) -> Result<(), Error> {
    let reserves = Reserves::new(to_wei(native_reserve)?, to_wei(token_reserve)?, 0);
    let direction = if reverse {
        SwapDirection::TokenToNative
    } else {
        SwapDirection::NativeToToken
    };
    let request = SwapRequest {
        input_amount: to_wei(amount)?,
        direction,
        minimum_output: 0,
    };
    let quote = swap::quote(&reserves, &request, config.pool.fee_bps())
        .map_err(|err| eyre!("quote: {err}"))?;

    let output = json!({
        "direction": quote.direction.to_string(),
        "amount_in": from_wei(quote.amount_in),
        "amount_out": from_wei(quote.amount_out),
        "fee_bps": config.pool.fee_bps(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn stress_test(
    config: &Config,
    tasks: usize,
    swaps: usize,
    max_swap: &str,
    seed: u64,
) -> Result<(), Error> {
    let options = StressOptions {
        tasks,
        swaps_per_task: swaps,
        max_swap: to_wei(max_swap)?,
        seed,
        progress: true,
        ..StressOptions::default()
    };
    let report = stress::run(options, config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    setup_logger(cli.verbose)?;

    let config = Config::from_env()?;
    info!(
        "fee {} bps, token {} ({})",
        config.pool.fee_bps(),
        config.token_name,
        config.token_symbol
    );

    match cli.command {
        Commands::Quote {
            native_reserve,
            token_reserve,
            amount,
            reverse,
        } => quote(&config, &native_reserve, &token_reserve, &amount, reverse)?,
        Commands::Price { reserve_a, reserve_b } => {
            let price = get_price(reserve_a, reserve_b).map_err(|err| eyre!("price: {err}"))?;
            println!("{price}");
        }
        Commands::Scenario { file } => {
            let scenario = Scenario::load(&file)?;
            let report = scenario::run(&scenario, &config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Stress {
            tasks,
            swaps,
            max_swap,
            seed,
        } => stress_test(&config, tasks, swaps, &max_swap, seed).await?,
    }

    Ok(())
}
