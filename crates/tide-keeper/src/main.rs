//! Tide keeper - Entry Point
//!
//! `run` starts the settlement daemon; every other subcommand performs a
//! single operator action against the configured deployment and exits.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tide_keeper::{AppConfig, Application, Ops};
use tracing::info;

/// Default minimum bet for new markets, 0.1 SUI.
const DEFAULT_MIN_BET_MIST: u64 = 100_000_000;

/// Settlement keeper and operator CLI for Tide prediction markets
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via TIDE_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the settlement daemon
    Run,
    /// One catch-up pass over a single market
    Settle { market: String },
    /// One catch-up pass over every configured market
    SettleAll,
    /// Pause a market
    PauseMarket { market: String },
    /// Resume a paused market
    ResumeMarket {
        market: String,
        /// First round start time; aligned from the on-chain interval
        /// when omitted
        #[arg(long)]
        start_time_ms: Option<u64>,
    },
    /// Create a new market in the registry
    CreateMarket {
        /// Pyth price feed id (hex)
        #[arg(long)]
        feed_id: String,
        /// Round duration in milliseconds
        #[arg(long)]
        interval_ms: u64,
        /// Minimum bet in MIST
        #[arg(long, default_value_t = DEFAULT_MIN_BET_MIST)]
        min_bet_mist: u64,
        /// First round start time; aligned to the interval when omitted
        #[arg(long)]
        start_time_ms: Option<u64>,
    },
    /// Bet on the live round of a market
    Bet {
        market: String,
        #[arg(value_enum)]
        direction: BetSide,
        amount_mist: u64,
    },
    /// Redeem a single ticket
    Redeem { market: String, ticket: String },
    /// Redeem every owned ticket in settled or cancelled rounds
    RedeemAll { market: String },
    /// Update registry-wide settlement parameters
    UpdateConfig {
        #[arg(long)]
        fee_bps: u64,
        #[arg(long)]
        settler_reward_bps: u64,
        #[arg(long)]
        price_tolerance_ms: u64,
    },
    /// Market status and registry config
    Info { market: Option<String> },
    /// Recent rounds, newest last
    Rounds {
        market: Option<String>,
        #[arg(long, default_value_t = 5)]
        count: u64,
    },
    /// Owned bet tickets, optionally filtered by market
    MyTickets { market: Option<String> },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BetSide {
    Up,
    Down,
}

impl BetSide {
    fn as_code(self) -> u8 {
        match self {
            Self::Up => 0,
            Self::Down => 1,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tide_telemetry::init_logging("info,tide=debug")?;

    // Config path: CLI arg > TIDE_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("TIDE_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());
    let config = AppConfig::from_file(&config_path)?;

    match args.command {
        Command::Run => {
            info!("Starting tide keeper v{}", env!("CARGO_PKG_VERSION"));
            info!(
                config_path = %config_path,
                markets = config.markets.len(),
                "Configuration loaded"
            );
            Application::new(config)?.run().await?;
        }
        Command::Settle { market } => Ops::new(config)?.settle(&market).await?,
        Command::SettleAll => Ops::new(config)?.settle_all().await?,
        Command::PauseMarket { market } => Ops::new(config)?.pause_market(&market).await?,
        Command::ResumeMarket {
            market,
            start_time_ms,
        } => {
            Ops::new(config)?
                .resume_market(&market, start_time_ms)
                .await?
        }
        Command::CreateMarket {
            feed_id,
            interval_ms,
            min_bet_mist,
            start_time_ms,
        } => {
            Ops::new(config)?
                .create_market(&feed_id, interval_ms, min_bet_mist, start_time_ms)
                .await?
        }
        Command::Bet {
            market,
            direction,
            amount_mist,
        } => {
            Ops::new(config)?
                .bet(&market, direction.as_code(), amount_mist)
                .await?
        }
        Command::Redeem { market, ticket } => Ops::new(config)?.redeem(&market, &ticket).await?,
        Command::RedeemAll { market } => Ops::new(config)?.redeem_all(&market).await?,
        Command::UpdateConfig {
            fee_bps,
            settler_reward_bps,
            price_tolerance_ms,
        } => {
            Ops::new(config)?
                .update_config(fee_bps, settler_reward_bps, price_tolerance_ms)
                .await?
        }
        Command::Info { market } => Ops::new(config)?.info(market.as_deref()).await?,
        Command::Rounds { market, count } => {
            Ops::new(config)?.rounds(market.as_deref(), count).await?
        }
        Command::MyTickets { market } => Ops::new(config)?.my_tickets(market.as_deref()).await?,
    }

    Ok(())
}
