//! Market data provider trait.

use crate::error::ProviderError;
use crate::types::{Candle, Interval, Quote, SymbolMatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Capability surface of an upstream market data source.
///
/// Every call may fail; `ProviderError::RateLimited` is reported separately
/// so callers can surface it as retryable with a hint.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch the latest quote for a symbol.
    async fn get_quote(&self, symbol: &str) -> Result<Quote, ProviderError>;

    /// Fetch historical candles.
    ///
    /// # Arguments
    /// * `symbol` - The symbol to fetch
    /// * `from` - Start of the range (inclusive)
    /// * `to` - End of the range (inclusive)
    /// * `interval` - The bar interval
    ///
    /// # Returns
    /// Candles ordered from oldest to newest; empty when the provider has
    /// no data for the range
    async fn get_candles(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        interval: Interval,
    ) -> Result<Vec<Candle>, ProviderError>;

    /// Search symbols by free-text query.
    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, ProviderError>;

    /// Get the provider name.
    fn name(&self) -> &str;
}
