//! TTL cache for quotes, candles and computed indicators.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use quotefeed_config::CacheSettings;
use quotefeed_core::{Candle, CandleRange, Clock, IndicatorResult, Quote, SystemClock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::glob::glob_match;

/// Cache key for the latest quote of a symbol.
pub fn quote_key(symbol: &str) -> String {
    format!("quote:{symbol}")
}

/// Cache key for a candle window.
pub fn candles_key(symbol: &str, range: &CandleRange) -> String {
    format!("candles:{symbol}:{}", range.cache_key_part())
}

/// Cache key for an indicator result over a candle window.
pub fn indicator_key(fingerprint: &str, range: &CandleRange) -> String {
    format!("indicator:{fingerprint}|{}", range.cache_key_part())
}

/// Cached value. Large payloads are shared, so reads are cheap clones.
#[derive(Debug, Clone)]
pub enum CachePayload {
    Quote(Quote),
    Candles(Arc<[Candle]>),
    Indicator(Arc<IndicatorResult>),
    Text(String),
}

impl CachePayload {
    pub fn as_quote(&self) -> Option<&Quote> {
        match self {
            CachePayload::Quote(q) => Some(q),
            _ => None,
        }
    }

    pub fn as_candles(&self) -> Option<&Arc<[Candle]>> {
        match self {
            CachePayload::Candles(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_indicator(&self) -> Option<&Arc<IndicatorResult>> {
        match self {
            CachePayload::Indicator(r) => Some(r),
            _ => None,
        }
    }
}

/// Runtime cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub default_ttl: Duration,
    pub quote_ttl: Duration,
    pub candles_ttl: Duration,
    pub indicator_ttl: Duration,
    pub negative_ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::from(&CacheSettings::default())
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            default_ttl: Duration::from_secs(settings.default_ttl_secs),
            quote_ttl: Duration::from_secs(settings.quote_ttl_secs),
            candles_ttl: Duration::from_secs(settings.candles_ttl_secs),
            indicator_ttl: Duration::from_secs(settings.indicator_ttl_secs),
            negative_ttl: Duration::from_secs(settings.negative_ttl_secs),
            sweep_interval: Duration::from_secs(settings.sweep_interval_secs),
        }
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

#[derive(Debug)]
struct CacheEntry {
    payload: CachePayload,
    expires_at_ms: i64,
}

impl CacheEntry {
    #[inline]
    fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at_ms
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// In-memory TTL store.
///
/// Entries are invisible once `now > created_at + ttl`, whether or not a
/// sweep has run. The lock is never held across an await point.
pub struct QuoteCache {
    state: Mutex<CacheState>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl QuoteCache {
    /// Create a cache on the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache with an injected time source.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a live entry. Expired entries are evicted on the way out.
    pub fn get(&self, key: &str) -> Option<CachePayload> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();

        let expired = match state.entries.get(key) {
            None => {
                state.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            state.entries.remove(key);
            state.evictions += 1;
            state.misses += 1;
            return None;
        }

        state.hits += 1;
        state.entries.get(key).map(|entry| entry.payload.clone())
    }

    /// Store a payload. `None` uses the default TTL.
    pub fn set(&self, key: impl Into<String>, payload: CachePayload, ttl: Option<Duration>) {
        let now = self.clock.now_ms();
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

        let entry = CacheEntry {
            payload,
            expires_at_ms: now.saturating_add(ttl_ms),
        };
        self.state.lock().entries.insert(key.into(), entry);
    }

    /// Remove a single key. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.state.lock().entries.remove(key).is_some()
    }

    /// Latest cached quote for a symbol.
    pub fn get_quote(&self, symbol: &str) -> Option<Quote> {
        match self.get(&quote_key(symbol))? {
            CachePayload::Quote(quote) => Some(quote),
            _ => None,
        }
    }

    /// Cache a quote under `quote:{SYMBOL}` with the quote TTL.
    pub fn set_quote(&self, quote: &Quote) {
        self.set(
            quote_key(&quote.symbol),
            CachePayload::Quote(quote.clone()),
            Some(self.config.quote_ttl),
        );
    }

    /// Remove every key matching a glob pattern (`*`, `?`, `[...]`).
    pub fn invalidate(&self, pattern: &str) -> usize {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|key, _| !glob_match(pattern, key));
        let removed = before - state.entries.len();
        drop(state);

        if removed > 0 {
            debug!(pattern, removed, "Invalidated cache entries");
        }
        removed
    }

    /// Remove every entry derived from a symbol.
    pub fn invalidate_symbol(&self, symbol: &str) -> usize {
        self.invalidate(&format!("quote:{}", escape_glob(symbol))) + self.invalidate_derived(symbol)
    }

    /// Drop candle and indicator entries for `symbol`, keeping its quote.
    pub fn invalidate_derived(&self, symbol: &str) -> usize {
        let escaped = escape_glob(symbol);
        self.invalidate(&format!("candles:{escaped}:*"))
            + self.invalidate(&format!("indicator:{escaped}:*"))
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - state.entries.len();
        state.evictions += removed as u64;
        removed
    }

    /// Round-trip a throwaway key through the store.
    pub fn is_healthy(&self) -> bool {
        let key = format!("__health__:{}", Uuid::new_v4());
        let token = Uuid::new_v4().to_string();

        self.set(key.clone(), CachePayload::Text(token.clone()), None);
        let healthy = matches!(self.get(&key), Some(CachePayload::Text(ref t)) if *t == token);
        self.remove(&key);

        if !healthy {
            warn!("Cache health check failed");
        }
        healthy
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            entries: state.entries.len(),
        }
    }

    /// Run `sweep_expired` every `interval` until `cancel` fires.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration, cancel: CancellationToken) -> SweepHandle {
        let cache = Arc::clone(self);
        let token = cancel.clone();

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        debug!("Cache sweeper cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = cache.sweep_expired();
                        if removed > 0 {
                            debug!(removed, remaining = cache.len(), "Swept expired cache entries");
                        }
                    }
                }
            }
        });

        info!(interval_secs = interval.as_secs(), "Cache sweeper started");
        SweepHandle { cancel, join }
    }
}

/// Handle to a running sweep task.
pub struct SweepHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl SweepHandle {
    /// Cancel the sweeper and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            warn!(error = %e, "Cache sweeper task failed");
        }
    }
}

fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '*' | '?' | '[' => {
                escaped.push('[');
                escaped.push(c);
                escaped.push(']');
            }
            _ => escaped.push(c),
        }
    }
    escaped
}
