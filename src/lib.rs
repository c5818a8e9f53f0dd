#![allow(clippy::too_many_arguments)]

// Core modules
pub mod analysis;
pub mod app;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod utils;

// Re-export the library entry points
pub use domain::{CoefficientSelector, Kline};
pub use engine::{
    EngineError, EngineSettings, compute_windowed_series, compute_windowed_series_with,
    fetch_partitioned, fetch_partitioned_with,
};

// CLI argument parsing
use {
    analysis::SplitPolicy,
    clap::{Args, Parser, Subcommand},
    config::ENGINE,
    std::path::PathBuf,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub source: PriceSource,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Where the price series comes from.
#[derive(Subcommand, Debug, Clone)]
pub enum PriceSource {
    /// Download historical klines from Binance, one calendar month per request chain
    Market {
        /// Trading pair, e.g. BTCUSDT
        #[arg(long)]
        symbol: String,
        /// First day, e.g. "01 Jan 2024" or 2024-01-01
        #[arg(long)]
        start: String,
        /// Day after the last one, same formats as --start
        #[arg(long)]
        end: String,
        /// Kline width in Binance shorthand (1m, 5m, 1h, 1d, ...)
        #[arg(long, default_value = "1m")]
        interval: String,
    },
    /// Generate a random walk instead of downloading prices
    RandomWalk {
        /// Number of values in the walk
        #[arg(long)]
        size: usize,
        /// Seed for a reproducible walk
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Regression output to report: a (slope), b (intercept) or ab (their sum)
    #[arg(long, global = true, default_value_t = ENGINE.regression.coefficient)]
    pub coefficient: CoefficientSelector,

    /// Regression window; defaults to 5% of the series length
    #[arg(long, global = true)]
    pub window: Option<usize>,

    /// Parallel workers; defaults to the number of hardware threads
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Positions a worker processes between progress reports
    #[arg(long, global = true, default_value_t = ENGINE.progress.batch_size)]
    pub batch_size: u64,

    /// How chunk sizes are derived from the worker count
    #[arg(long, global = true, value_enum, default_value_t = ENGINE.split_policy)]
    pub split: SplitPolicy,

    /// Directory the series files are written to
    #[arg(long, global = true, default_value = ".")]
    pub output_dir: PathBuf,

    /// Only write the price series
    #[arg(long, global = true, default_value_t = false)]
    pub skip_regression: bool,
}
