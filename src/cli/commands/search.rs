//! Symbol search command.

use anyhow::{Context, Result};
use quotefeed_config::AppConfig;

use super::build_service;
use crate::cli::SearchArgs;

pub async fn run(args: SearchArgs, config: &AppConfig) -> Result<()> {
    let service = build_service(config)?;
    let matches = service
        .search(&args.query)
        .await
        .with_context(|| format!("Search for {:?} failed", args.query))?;

    if matches.is_empty() {
        println!("No matches");
        return Ok(());
    }
    for m in matches {
        println!("{:<12} {:<14} {}", m.symbol, m.kind, m.description);
    }
    Ok(())
}
