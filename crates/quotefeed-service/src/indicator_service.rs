//! Point-in-time indicator requests.

use std::sync::Arc;

use quotefeed_core::{
    normalize_symbol, CalculateResponse, Candle, CandleRange, CandleSeries, Clock, FeedError,
    FeedResult, IndicatorRequest, IndicatorResult, MarketDataProvider, Quote,
    SymbolMatch, SystemClock,
};
use quotefeed_data::{candles_key, indicator_key, CachePayload, QuoteCache};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::bounded;
use crate::config::ServiceConfig;

/// Answers "indicator X for symbol Y over range Z" requests.
///
/// Candles come from the cache when possible and from the provider
/// otherwise; computation runs on a bounded blocking pool so a long
/// calculation never stalls the async workers.
pub struct IndicatorService {
    provider: Arc<dyn MarketDataProvider>,
    cache: Arc<QuoteCache>,
    clock: Arc<dyn Clock>,
    workers: Arc<Semaphore>,
    config: ServiceConfig,
}

impl IndicatorService {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        cache: Arc<QuoteCache>,
        config: ServiceConfig,
    ) -> Self {
        Self::with_clock(provider, cache, config, Arc::new(SystemClock))
    }

    /// Create a service with an injected time source for default ranges.
    pub fn with_clock(
        provider: Arc<dyn MarketDataProvider>,
        cache: Arc<QuoteCache>,
        config: ServiceConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let workers = Arc::new(Semaphore::new(config.max_concurrent_calculations));
        Self {
            provider,
            cache,
            clock,
            workers,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<QuoteCache> {
        &self.cache
    }

    pub fn provider(&self) -> &Arc<dyn MarketDataProvider> {
        &self.provider
    }

    /// Compute an indicator.
    ///
    /// Parameters are validated before any data is fetched. Provider
    /// failures surface as `ProviderUnavailable` or `RateLimited`; too few
    /// candles is not an error and yields undefined or empty series.
    pub async fn calculate(&self, request: &IndicatorRequest) -> FeedResult<IndicatorResult> {
        let resolved = request.resolve()?;
        let range = match request.range {
            Some(range) => range,
            None => CandleRange::trailing(
                self.clock.now_ms(),
                self.config.default_lookback_bars,
                self.config.default_interval,
            )?,
        };
        if range.from_ms > range.to_ms {
            return Err(FeedError::InvalidParameter(format!(
                "range start {} is after range end {}",
                range.from_ms, range.to_ms
            )));
        }

        let result_key = indicator_key(&resolved.fingerprint(), &range);
        if self.config.cache_results {
            if let Some(CachePayload::Indicator(hit)) = self.cache.get(&result_key) {
                debug!(key = %result_key, "Indicator cache hit");
                return Ok(IndicatorResult::clone(&hit));
            }
        }

        let candles = self.fetch_candles(&resolved.symbol, &range).await?;
        let has_data = !candles.is_empty();
        let series = CandleSeries::new(resolved.symbol.clone(), range.interval, candles.to_vec());

        let permit = Arc::clone(&self.workers)
            .acquire_owned()
            .await
            .map_err(|_| FeedError::Internal("indicator worker pool closed".into()))?;
        let spec = resolved.spec;
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            quotefeed_indicators::compute(&spec, &series)
        })
        .await
        .map_err(|e| FeedError::Internal(format!("indicator task failed: {e}")))??;

        if self.config.cache_results && has_data {
            self.cache.set(
                result_key,
                CachePayload::Indicator(Arc::new(result.clone())),
                Some(self.cache.config().indicator_ttl),
            );
        }

        info!(
            symbol = %resolved.symbol,
            indicator = %spec.kind(),
            candles = result.timestamps.len(),
            "Indicator calculated"
        );
        Ok(result)
    }

    /// Run `calculate` and shape the outcome for the request boundary.
    pub async fn handle(&self, request: &IndicatorRequest) -> (u16, CalculateResponse) {
        let result = self.calculate(request).await;
        match &result {
            Err(e) if e.is_retryable() => {
                info!(symbol = %request.symbol, error = %e, "Calculate request deferred")
            }
            Err(e) => warn!(symbol = %request.symbol, error = %e, "Calculate request failed"),
            Ok(_) => {}
        }
        CalculateResponse::from_result(result)
    }

    /// Parse a raw JSON request body and handle it.
    pub async fn handle_json(&self, body: &str) -> (u16, CalculateResponse) {
        match serde_json::from_str::<IndicatorRequest>(body) {
            Ok(request) => self.handle(&request).await,
            Err(e) => CalculateResponse::from_result(Err(FeedError::InvalidParameter(format!(
                "malformed request: {e}"
            )))),
        }
    }

    /// Latest quote, served from cache when fresh.
    pub async fn quote(&self, symbol: &str) -> FeedResult<Quote> {
        let symbol = normalize_symbol(symbol)?;
        if let Some(quote) = self.cache.get_quote(&symbol) {
            return Ok(quote);
        }

        let quote = bounded(self.config.fetch_timeout, self.provider.get_quote(&symbol)).await?;
        self.cache.set_quote(&quote);
        Ok(quote)
    }

    /// Free-text symbol search.
    pub async fn search(&self, query: &str) -> FeedResult<Vec<SymbolMatch>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FeedError::InvalidParameter("search query is empty".into()));
        }
        bounded(self.config.fetch_timeout, self.provider.search_symbols(query)).await
    }

    /// Candles for a range: cache first, then the provider.
    ///
    /// Empty upstream results are cached with the negative TTL only; a
    /// failed or timed-out fetch leaves the cache untouched.
    async fn fetch_candles(&self, symbol: &str, range: &CandleRange) -> FeedResult<Arc<[Candle]>> {
        let key = candles_key(symbol, range);
        if let Some(CachePayload::Candles(candles)) = self.cache.get(&key) {
            debug!(key = %key, count = candles.len(), "Candle cache hit");
            return Ok(candles);
        }

        let fetched = bounded(
            self.config.fetch_timeout,
            self.provider.get_candles(
                symbol,
                range.from_datetime(),
                range.to_datetime(),
                range.interval,
            ),
        )
        .await?;

        let normalized = CandleSeries::new(symbol, range.interval, fetched).into_candles();
        let candles: Arc<[Candle]> = Arc::from(normalized);

        let cache_config = self.cache.config();
        let ttl = if candles.is_empty() {
            cache_config.negative_ttl
        } else {
            cache_config.candles_ttl
        };
        if !ttl.is_zero() {
            self.cache
                .set(key, CachePayload::Candles(Arc::clone(&candles)), Some(ttl));
        }

        debug!(symbol, count = candles.len(), provider = self.provider.name(), "Fetched candles");
        Ok(candles)
    }
}
