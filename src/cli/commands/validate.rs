//! Validate configuration command.

use anyhow::Result;
use quotefeed_config::AppConfig;
use std::path::Path;

use crate::cli::ValidateArgs;

pub async fn run(args: ValidateArgs, config: &AppConfig, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => println!("Validating configuration: {}", path.display()),
        None => println!("Validating built-in defaults and environment"),
    }

    if let Err(e) = config.validate() {
        println!("Configuration error: {e}");
        return Err(e.into());
    }

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!("Provider: {:?}", config.provider.kind);
    println!("Listen address: {}", config.server.bind_addr);
    println!("Poll interval: {}ms", config.poller.interval_ms);
    println!("Quote TTL: {}s", config.cache.quote_ttl_secs);
    println!("Outbound buffer: {}", config.hub.outbound_buffer);

    if args.show {
        println!();
        print!("{}", config.to_toml()?);
    }
    Ok(())
}
