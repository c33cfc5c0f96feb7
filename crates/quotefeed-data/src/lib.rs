//! Quote cache and market data providers.

mod cache;
mod csv_source;
mod finnhub;
mod glob;

pub use cache::{
    candles_key, indicator_key, quote_key, CacheConfig, CachePayload, CacheStats, QuoteCache,
    SweepHandle,
};
pub use csv_source::CsvProvider;
pub use finnhub::{FinnhubConfig, FinnhubProvider, DEFAULT_RETRY_AFTER_SECS};

use std::sync::Arc;

use quotefeed_config::{ProviderKind, ProviderSettings};
use quotefeed_core::{MarketDataProvider, ProviderError};

/// Build the provider selected in configuration.
pub fn build_provider(settings: &ProviderSettings) -> Result<Arc<dyn MarketDataProvider>, ProviderError> {
    match settings.kind {
        ProviderKind::Finnhub => Ok(Arc::new(FinnhubProvider::from_settings(settings)?)),
        ProviderKind::Csv => {
            let dir = settings.csv_dir.as_deref().ok_or_else(|| {
                ProviderError::Configuration("provider.csv_dir is not set".into())
            })?;
            Ok(Arc::new(CsvProvider::new(dir)?))
        }
    }
}
