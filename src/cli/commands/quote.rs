//! Quote lookup command.

use anyhow::{Context, Result};
use quotefeed_config::AppConfig;

use super::build_service;
use crate::cli::QuoteArgs;

pub async fn run(args: QuoteArgs, config: &AppConfig) -> Result<()> {
    let service = build_service(config)?;
    let quote = service
        .quote(&args.symbol)
        .await
        .with_context(|| format!("Failed to fetch quote for {}", args.symbol))?;

    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}
