//! NAVI AutoFi CLI
//!
//! Command-line interface for the yield optimization agent.

use clap::{Parser, Subcommand};
use navi_autofi::actions::{
    CheckHealthInput, HarvestInput, OptimizeYieldInput, SupplyInput, SwapInput, WithdrawInput,
};
use navi_autofi::engine::types::Amount;
use navi_autofi::engine::{MarketSnapshotReader, OpportunityRanker};
use navi_autofi::{
    narrator, runner, Action, ActionOutcome, ActionSet, AgentRunner, Capabilities, Config, Error,
    HttpGateway, PaperMarket, Result, RpcConfig,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Account used when a fresh paper market is created without a configured address
const PAPER_ADDRESS: &str = "0xa11ce";

#[derive(Parser)]
#[command(name = "autofi")]
#[command(about = "Yield optimization and risk scoring agent for NAVI on Sui")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Use a paper market persisted at this file instead of the gateway
    #[arg(long, global = true)]
    paper: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitoring loop
    Run {
        /// Log recommendations without executing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Check an account's health factor
    Health {
        /// Sui address (defaults to the configured account)
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Rank markets and recommend strategies
    Optimize {
        /// Sui address (defaults to the configured account)
        #[arg(short, long)]
        address: Option<String>,

        /// Risk level from 1 (conservative) to 5 (aggressive)
        #[arg(short, long)]
        risk_level: Option<u8>,
    },

    /// Show pools, prices and ranked opportunities
    Market {
        /// Markets to read (defaults to the configured markets)
        tokens: Vec<String>,
    },

    /// Supply coins into a pool
    Supply {
        #[arg(long)]
        token: String,

        /// Amount in base units
        #[arg(long)]
        amount: Amount,
    },

    /// Withdraw supplied coins
    Withdraw {
        #[arg(long)]
        token: String,

        /// Amount in base units
        #[arg(long)]
        amount: Amount,
    },

    /// Swap coins along the best route
    Swap {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// Amount of `from` in base units
        #[arg(long)]
        amount: Amount,

        /// Slippage tolerance in percent
        #[arg(long)]
        slippage: Option<f64>,

        /// Sell supplied collateral instead of wallet coins
        #[arg(long)]
        from_collateral: bool,
    },

    /// Claim available rewards
    Harvest,

    /// Show current configuration
    Config,

    /// Print the JSON schema of every action input
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    // Load config
    let mut config: Config = if let Some(ref config_path) = cli.config {
        let content =
            std::fs::read_to_string(config_path).map_err(|e| Error::Config(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))?
    } else {
        Config::default()
    };
    if let Some(ref paper) = cli.paper {
        config.paper_market_file = Some(paper.display().to_string());
    }

    match cli.command {
        Commands::Config => print_json(&config)?,
        Commands::Schema => print_json(&ActionSet::schemas())?,
        Commands::Market { tokens } => {
            let capabilities = build_capabilities(&config).await?;
            let tokens = if tokens.is_empty() {
                config.market_symbols()
            } else {
                tokens
            };
            let snapshot = MarketSnapshotReader::read(capabilities.market.as_ref(), &tokens).await;
            let opportunities = OpportunityRanker::rank(&snapshot.pools);
            print_json(&serde_json::json!({
                "pools": snapshot.pools,
                "prices": snapshot.prices,
                "opportunities": opportunities,
            }))?;
        }
        Commands::Run { dry_run } => {
            let capabilities = build_capabilities(&config).await?;
            let narrator = narrator::from_settings(&config.narrator)?;
            tracing::info!(
                network = config.network.name(),
                markets = ?config.market_symbols(),
                dry_run,
                "Starting AutoFi agent"
            );
            AgentRunner::new(config, dry_run, capabilities, narrator)
                .run()
                .await?;
        }
        command => {
            let capabilities = build_capabilities(&config).await?;
            let narrator = narrator::from_settings(&config.narrator)?;
            let address = capabilities.address.clone();
            let actions = ActionSet::new(capabilities, &config, narrator);
            let outcome = run_action(&actions, command, address).await;
            print_json(&outcome)?;
        }
    }

    Ok(())
}

async fn run_action(actions: &ActionSet, command: Commands, signer: String) -> ActionOutcome {
    match command {
        Commands::Health { address } => {
            actions
                .check_health
                .execute(CheckHealthInput {
                    address: address.unwrap_or(signer),
                })
                .await
        }
        Commands::Optimize {
            address,
            risk_level,
        } => {
            actions
                .optimize_yield
                .execute(OptimizeYieldInput {
                    address: address.unwrap_or(signer),
                    risk_level,
                })
                .await
        }
        Commands::Supply { token, amount } => {
            actions.supply.execute(SupplyInput { token, amount }).await
        }
        Commands::Withdraw { token, amount } => {
            actions.withdraw.execute(WithdrawInput { token, amount }).await
        }
        Commands::Swap {
            from,
            to,
            amount,
            slippage,
            from_collateral,
        } => {
            actions
                .swap
                .execute(SwapInput {
                    from_token: from,
                    to_token: to,
                    amount,
                    slippage_percent: slippage,
                    from_collateral,
                })
                .await
        }
        Commands::Harvest => {
            actions
                .harvest_rewards
                .execute(HarvestInput { address: signer })
                .await
        }
        Commands::Run { .. } | Commands::Market { .. } | Commands::Config | Commands::Schema => {
            ActionOutcome::failure("not an action command")
        }
    }
}

/// Paper market when a state file is configured, the HTTP gateway otherwise.
/// The ledger is wrapped in the guard pipeline either way.
async fn build_capabilities(config: &Config) -> Result<Capabilities> {
    let capabilities = if let Some(ref path) = config.paper_market_file {
        let address = config.address.as_deref().unwrap_or(PAPER_ADDRESS);
        let market = Arc::new(PaperMarket::load_or_create(path, address).await?);
        let address = market.address().await;
        tracing::info!(path = %path, address = %address, "Using paper market");
        Capabilities::from_gateway(market, address)
    } else {
        let rpc = RpcConfig::for_config(config);
        let address = config.address.clone().ok_or_else(|| {
            Error::Config("no account address configured (set \"address\" in the config)".to_string())
        })?;
        let gateway = Arc::new(HttpGateway::from_rpc(&rpc)?);
        tracing::info!(
            gateway = %rpc.gateway_url,
            network = rpc.network.name(),
            fullnode = %rpc.sui_rpc_url,
            address = %address,
            "Using protocol gateway"
        );
        Capabilities::from_gateway(gateway, address)
    };

    let ledger = runner::guarded_ledger(config, capabilities.ledger.clone()).await?;
    Ok(capabilities.with_ledger(ledger))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
