//! Quote feed CLI application.

mod cli;
mod ws;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use quotefeed_config::load_config;
use quotefeed_monitor::setup_logging;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    // Setup logging; the guard keeps the file writer alive
    let level = cli
        .log_level
        .map_or(config.logging.level.as_str(), |level| level.as_str());
    let json = cli.json_logs || config.logging.is_json();
    let _log_guard = setup_logging(level, json, config.logging.file.as_deref().map(Path::new))
        .context("Failed to initialize logging")?;

    // Execute command
    match cli.command {
        Commands::Serve(args) => cli::commands::serve::run(args, &config).await,
        Commands::Calculate(args) => cli::commands::calculate::run(args, &config).await,
        Commands::Quote(args) => cli::commands::quote::run(args, &config).await,
        Commands::Search(args) => cli::commands::search::run(args, &config).await,
        Commands::ValidateConfig(args) => {
            cli::commands::validate::run(args, &config, cli.config.as_deref()).await
        }
    }
}
