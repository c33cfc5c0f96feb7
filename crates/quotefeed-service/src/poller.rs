//! Timer-driven quote ingestion.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use quotefeed_core::{normalize_symbol, FeedError, MarketDataProvider, Quote};
use quotefeed_data::QuoteCache;
use quotefeed_hub::{BroadcastReport, SubscriptionHub};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bounded;
use crate::config::PollerConfig;

/// Outcome of one polling tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Quotes fetched successfully
    pub fetched: usize,
    /// Quotes that changed and were broadcast
    pub broadcast: usize,
    pub failed: usize,
    /// The tick stopped early on a rate limit
    pub rate_limited: bool,
}

/// Fetches quotes for every actively subscribed symbol on a fixed cadence,
/// refreshes the cache and fans changes out through the hub.
pub struct QuotePoller {
    provider: Arc<dyn MarketDataProvider>,
    cache: Arc<QuoteCache>,
    hub: Arc<SubscriptionHub>,
    config: PollerConfig,
    /// Last quote broadcast per symbol
    published: Mutex<HashMap<String, Quote>>,
}

impl QuotePoller {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        cache: Arc<QuoteCache>,
        hub: Arc<SubscriptionHub>,
        config: PollerConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            hub,
            config,
            published: Mutex::new(HashMap::new()),
        }
    }

    /// Accept a fresh quote from any source.
    ///
    /// The symbol is normalized and the cache is always refreshed.
    /// Subscribers are only notified when the quote differs from the last
    /// one broadcast for that symbol, and a change also drops the symbol's
    /// cached candles and indicator results. Returns `None` when nothing
    /// was broadcast.
    pub fn ingest(&self, quote: Quote) -> Option<BroadcastReport> {
        let quote = match normalize_symbol(&quote.symbol) {
            Ok(symbol) => Quote { symbol, ..quote },
            Err(e) => {
                warn!(error = %e, "Dropping quote with invalid symbol");
                return None;
            }
        };

        // Held across the broadcast so concurrent ingests of one symbol are
        // compared, cached and delivered in a single order.
        let mut published = self.published.lock();
        self.cache.set_quote(&quote);
        if published
            .get(&quote.symbol)
            .is_some_and(|previous| !previous.differs_from(&quote))
        {
            return None;
        }
        published.insert(quote.symbol.clone(), quote.clone());

        let invalidated = self.cache.invalidate_derived(&quote.symbol);
        let report = self.hub.on_quote_update(&quote);
        drop(published);

        if report.disconnected > 0 || invalidated > 0 {
            debug!(
                symbol = %quote.symbol,
                disconnected = report.disconnected,
                invalidated,
                "Quote changed"
            );
        }
        Some(report)
    }

    /// Run one polling pass over the hub's active symbols.
    pub async fn poll_once(&self) -> PollReport {
        let symbols = self.hub.active_symbols();
        {
            let active: HashSet<&str> = symbols.iter().map(String::as_str).collect();
            self.published
                .lock()
                .retain(|symbol, _| active.contains(symbol.as_str()));
        }

        let mut report = PollReport::default();
        if symbols.is_empty() {
            return report;
        }

        let timeout = self.config.fetch_timeout;
        let provider = &self.provider;
        let mut fetches = stream::iter(symbols)
            .map(|symbol| async move {
                let result = bounded(timeout, provider.get_quote(&symbol)).await;
                (symbol, result)
            })
            .buffer_unordered(self.config.max_concurrent_fetches);

        while let Some((symbol, result)) = fetches.next().await {
            match result {
                Ok(quote) => {
                    report.fetched += 1;
                    if self.ingest(quote).is_some() {
                        report.broadcast += 1;
                    }
                }
                Err(FeedError::RateLimited { retry_after_secs }) => {
                    warn!(symbol = %symbol, retry_after_secs, "Rate limited, skipping rest of tick");
                    report.rate_limited = true;
                    break;
                }
                Err(e) => {
                    debug!(symbol = %symbol, error = %e, "Quote fetch failed");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Poll every `interval` until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Quote poller cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.poll_once().await;
                    if report.fetched > 0 || report.failed > 0 {
                        debug!(
                            fetched = report.fetched,
                            broadcast = report.broadcast,
                            failed = report.failed,
                            "Poll tick"
                        );
                    }
                }
            }
        }
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            provider = self.provider.name(),
            "Quote poller started"
        );
        tokio::spawn(Arc::clone(self).run(cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use quotefeed_core::{CandleRange, Interval, ProviderError, ServerMessage};
    use quotefeed_data::{candles_key, indicator_key, CacheConfig, CachePayload};
    use quotefeed_hub::HubConfig;
    use std::time::Duration;

    struct Fixture {
        provider: Arc<ScriptedProvider>,
        cache: Arc<QuoteCache>,
        hub: Arc<SubscriptionHub>,
        poller: Arc<QuotePoller>,
    }

    fn fixture(provider: ScriptedProvider) -> Fixture {
        let provider = Arc::new(provider);
        let cache = Arc::new(QuoteCache::new(CacheConfig::default()));
        let hub = Arc::new(SubscriptionHub::new(HubConfig::default()));
        let poller = Arc::new(QuotePoller::new(
            provider.clone(),
            cache.clone(),
            hub.clone(),
            PollerConfig {
                interval: Duration::from_secs(1),
                max_concurrent_fetches: 2,
                fetch_timeout: Duration::from_millis(200),
            },
        ));
        Fixture {
            provider,
            cache,
            hub,
            poller,
        }
    }

    #[tokio::test]
    async fn test_poll_broadcasts_changes_only() {
        let f = fixture(ScriptedProvider::with_candles(vec![]));
        let mut conn = f.hub.connect();
        f.hub.subscribe(conn.id, "AAPL").unwrap();
        f.provider.set_price("AAPL", 190.0);

        let report = f.poller.poll_once().await;
        assert_eq!(report.fetched, 1);
        assert_eq!(report.broadcast, 1);
        assert!(matches!(
            conn.receiver.try_recv().unwrap(),
            ServerMessage::Quote { data } if data.price == 190.0
        ));
        assert_eq!(f.cache.get_quote("AAPL").unwrap().price, 190.0);

        // Same snapshot again: cached, not re-broadcast
        let report = f.poller.poll_once().await;
        assert_eq!(report.broadcast, 0);
        assert!(conn.receiver.try_recv().is_err());

        f.provider.set_price("AAPL", 191.0);
        assert_eq!(f.poller.poll_once().await.broadcast, 1);
    }

    #[tokio::test]
    async fn test_no_subscribers_no_fetch() {
        let f = fixture(ScriptedProvider::with_candles(vec![]));
        assert_eq!(f.poller.poll_once().await, PollReport::default());
        assert_eq!(f.provider.quote_calls(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let f = fixture(ScriptedProvider::with_candles(vec![]));
        let conn = f.hub.connect();
        f.hub.subscribe(conn.id, "AAPL").unwrap();
        f.hub.subscribe(conn.id, "MSFT").unwrap();
        f.provider
            .fail_symbol("MSFT", ProviderError::Unavailable("down".into()));

        let report = f.poller.poll_once().await;
        assert_eq!(report.fetched, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.rate_limited);
    }

    #[tokio::test]
    async fn test_rate_limit_stops_tick() {
        let f = fixture(ScriptedProvider::failing(ProviderError::RateLimited {
            retry_after_secs: 5,
        }));
        let conn = f.hub.connect();
        for symbol in ["AAPL", "MSFT", "TSLA", "NVDA", "AMZN"] {
            f.hub.subscribe(conn.id, symbol).unwrap();
        }

        let report = f.poller.poll_once().await;
        assert!(report.rate_limited);
        assert_eq!(report.fetched, 0);
        // Concurrency is 2, so the tick stops before touching every symbol
        assert!(f.provider.quote_calls() < 5);
    }

    #[tokio::test]
    async fn test_ingest_push() {
        let f = fixture(ScriptedProvider::with_candles(vec![]));
        let mut conn = f.hub.connect();
        f.hub.subscribe(conn.id, "TSLA").unwrap();

        let quote = Quote {
            symbol: "TSLA".into(),
            price: 250.0,
            change: 1.0,
            change_percent: 0.4,
            high: 251.0,
            low: 249.0,
            open: 249.5,
            previous_close: 249.0,
            volume: 10.0,
            timestamp_ms: 1,
        };
        let report = f.poller.ingest(quote.clone()).unwrap();
        assert_eq!(report.delivered, 1);
        assert!(f.poller.ingest(quote).is_none());
        assert!(conn.receiver.try_recv().is_ok());
        assert!(conn.receiver.try_recv().is_err());
    }

    fn pushed(symbol: &str, price: f64) -> Quote {
        Quote {
            symbol: symbol.into(),
            price,
            change: 0.0,
            change_percent: 0.0,
            high: price,
            low: price,
            open: price,
            previous_close: price,
            volume: 10.0,
            timestamp_ms: price as i64,
        }
    }

    #[tokio::test]
    async fn test_ingest_normalizes_symbol() {
        let f = fixture(ScriptedProvider::with_candles(vec![]));
        let mut conn = f.hub.connect();
        f.hub.subscribe(conn.id, "AAPL").unwrap();

        let report = f.poller.ingest(pushed(" aapl", 190.0)).unwrap();
        assert_eq!(report.delivered, 1);
        assert!(matches!(
            conn.receiver.try_recv().unwrap(),
            ServerMessage::Quote { data } if data.symbol == "AAPL"
        ));
        assert_eq!(f.cache.get_quote("AAPL").unwrap().price, 190.0);
        assert!(f.cache.get_quote("aapl").is_none());

        assert!(f.poller.ingest(pushed("../AAPL", 1.0)).is_none());
        assert!(conn.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_change_invalidates_derived_entries() {
        let f = fixture(ScriptedProvider::with_candles(vec![]));
        let range = CandleRange::new(0, 86_400_000, Interval::Daily);
        let candles = candles_key("TSLA", &range);
        let indicator = indicator_key(r#"TSLA:sma:{"period":5}"#, &range);
        let other = candles_key("MSFT", &range);
        for key in [&candles, &indicator, &other] {
            f.cache.set(key.clone(), CachePayload::Text("x".into()), None);
        }

        f.poller.ingest(pushed("TSLA", 250.0)).unwrap();
        assert!(f.cache.get(&candles).is_none());
        assert!(f.cache.get(&indicator).is_none());
        assert!(f.cache.get(&other).is_some());

        // An unchanged quote leaves fresh derived entries alone
        f.cache.set(candles.clone(), CachePayload::Text("y".into()), None);
        assert!(f.poller.ingest(pushed("TSLA", 250.0)).is_none());
        assert!(f.cache.get(&candles).is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingest_broadcasts_once() {
        let f = fixture(ScriptedProvider::with_candles(vec![]));
        let mut conn = f.hub.connect();
        f.hub.subscribe(conn.id, "NVDA").unwrap();

        let barrier = Arc::new(tokio::sync::Barrier::new(8));
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let poller = f.poller.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    poller.ingest(pushed("NVDA", 120.0)).is_some()
                })
            })
            .collect();

        let mut broadcasts = 0;
        for task in tasks {
            if task.await.unwrap() {
                broadcasts += 1;
            }
        }
        assert_eq!(broadcasts, 1);
        assert!(conn.receiver.try_recv().is_ok());
        assert!(conn.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cached_quote_does_not_suppress_first_broadcast() {
        let f = fixture(ScriptedProvider::with_candles(vec![]));
        f.provider.set_price("AMZN", 180.0);
        // Cached by a one-shot lookup before anyone subscribed
        f.cache.set_quote(&f.provider.get_quote("AMZN").await.unwrap());

        let mut conn = f.hub.connect();
        f.hub.subscribe(conn.id, "AMZN").unwrap();

        assert_eq!(f.poller.poll_once().await.broadcast, 1);
        assert!(matches!(
            conn.receiver.try_recv().unwrap(),
            ServerMessage::Quote { data } if data.price == 180.0
        ));
    }

    #[tokio::test]
    async fn test_resubscribed_symbol_is_broadcast_again() {
        let f = fixture(ScriptedProvider::with_candles(vec![]));
        f.provider.set_price("AAPL", 190.0);
        let first = f.hub.connect();
        f.hub.subscribe(first.id, "AAPL").unwrap();
        assert_eq!(f.poller.poll_once().await.broadcast, 1);

        f.hub.on_disconnect(first.id);
        assert_eq!(f.poller.poll_once().await, PollReport::default());

        let mut second = f.hub.connect();
        f.hub.subscribe(second.id, "AAPL").unwrap();
        assert_eq!(f.poller.poll_once().await.broadcast, 1);
        assert!(second.receiver.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_cancelled() {
        let f = fixture(ScriptedProvider::with_candles(vec![]));
        let conn = f.hub.connect();
        f.hub.subscribe(conn.id, "AAPL").unwrap();

        let cancel = CancellationToken::new();
        let handle = f.poller.spawn(cancel.clone());

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        let calls = f.provider.quote_calls();
        assert!(calls >= 2, "expected at least two ticks, got {calls}");

        cancel.cancel();
        handle.await.unwrap();
    }
}
