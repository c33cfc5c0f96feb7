//! CLI command implementations.

pub mod calculate;
pub mod quote;
pub mod search;
pub mod serve;
pub mod validate;

use std::sync::Arc;

use anyhow::{Context, Result};
use quotefeed_config::AppConfig;
use quotefeed_data::{build_provider, CacheConfig, QuoteCache};
use quotefeed_service::{IndicatorService, ServiceConfig};

/// Provider, cache and indicator service for the one-shot commands.
pub fn build_service(config: &AppConfig) -> Result<IndicatorService> {
    let provider =
        build_provider(&config.provider).context("Failed to create market data provider")?;
    let cache = Arc::new(QuoteCache::new(CacheConfig::from(&config.cache)));
    Ok(IndicatorService::new(
        provider,
        cache,
        ServiceConfig::from(&config.service),
    ))
}
