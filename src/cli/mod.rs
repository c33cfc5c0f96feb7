//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use quotefeed_core::{IndicatorKind, Interval};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quotefeed")]
#[command(author, version, about = "Market data cache, indicator engine and quote fan-out")]
pub struct Cli {
    /// Configuration file path (defaults and QUOTEFEED__* env vars apply without one)
    #[arg(short, long, env = "QUOTEFEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level, overrides the configured one
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the quote poller and the WebSocket subscription endpoint
    Serve(ServeArgs),
    /// Compute an indicator over recent candles
    Calculate(CalculateArgs),
    /// Fetch the latest quote for a symbol
    Quote(QuoteArgs),
    /// Search for symbols
    Search(SearchArgs),
    /// Validate configuration
    ValidateConfig(ValidateArgs),
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Listen address, overrides server.bind_addr
    #[arg(short, long)]
    pub bind: Option<String>,
}

#[derive(clap::Args)]
pub struct CalculateArgs {
    /// Ticker symbol
    #[arg(short, long)]
    pub symbol: String,

    /// Indicator type (sma, ema, rsi, macd, bollinger)
    #[arg(short, long)]
    pub indicator: IndicatorKind,

    /// Indicator parameters as a JSON object, e.g. '{"period": 20}'
    #[arg(short, long, default_value = "{}")]
    pub params: String,

    /// Candle interval (1m, 5m, 15m, 30m, 1h, 1d, 1w, 1M)
    #[arg(long)]
    pub interval: Option<Interval>,

    /// Number of trailing bars
    #[arg(long)]
    pub bars: Option<u32>,

    /// Only print the last N rows
    #[arg(long)]
    pub tail: Option<usize>,
}

#[derive(clap::Args)]
pub struct QuoteArgs {
    /// Ticker symbol
    #[arg(short, long)]
    pub symbol: String,
}

#[derive(clap::Args)]
pub struct SearchArgs {
    /// Free-text query
    #[arg(short, long)]
    pub query: String,
}

#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Print the effective configuration as TOML
    #[arg(long)]
    pub show: bool,
}
