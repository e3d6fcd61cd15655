#![allow(clippy::collapsible_if)]
#![allow(clippy::type_complexity)]

// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod utils;

// Re-export commonly used types outside of crate (for the CLI)
pub use analysis::{build_board, generate_chart_data};
pub use config::{DEMO, MARKET, PERSISTENCE, TRADING};
pub use data::{
    AccountStore, BinanceQuoteSource, MarketData, MemoryAccountStore, MockQuoteSource,
    PriceStreamManager, QuoteSource, SqliteAccountStore,
};
pub use domain::{AssetClass, AssetQuote, QuoteSnapshot, Timeframe, TradeDirection, TradeRequest};
pub use engine::{AccountEvent, ProfitAccrual, TradeError, TradingDesk};

// CLI argument parsing
use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Seed the mock quote source and sparklines for reproducible output
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Pull crypto quotes from Binance instead of the mock source
    #[arg(long, global = true, default_value_t = false)]
    pub live_crypto: bool,

    /// Keep accounts in a SQLite file instead of memory
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        default_missing_value = PERSISTENCE.accounts.db_path
    )]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the market board for one class, or all of them
    Quotes {
        #[arg(long)]
        class: Option<AssetClass>,
        /// Sparkline length
        #[arg(long, default_value_t = MARKET.sparkline_points)]
        points: usize,
    },
    /// Subscribe to a polled feed and print each snapshot
    Stream {
        #[arg(long, default_value = "crypto")]
        class: AssetClass,
        /// Symbols to watch (defaults to the class watchlist)
        symbols: Vec<String>,
        /// Stop after this many snapshots
        #[arg(long, default_value_t = 3)]
        ticks: usize,
    },
    /// Open a Smart Trading plan on a demo account and project its profit
    Trade {
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value = "1 Day")]
        timeframe: Timeframe,
        #[arg(long, default_value = "BTC")]
        symbol: String,
        #[arg(long, default_value = "buy")]
        direction: TradeDirection,
        /// Deposit credited before the trade
        #[arg(long, default_value_t = DEMO.starting_deposit)]
        deposit: f64,
        /// Hours of accrual to simulate after opening
        #[arg(long, default_value_t = 12)]
        hours: i64,
    },
    /// Print a synthetic price walk
    Synth {
        #[arg(long)]
        price: f64,
        #[arg(long, default_value_t = 30)]
        points: usize,
        /// Downward trend bias
        #[arg(long, default_value_t = false)]
        down: bool,
    },
}
