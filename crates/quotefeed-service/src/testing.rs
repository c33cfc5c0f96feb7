//! Scripted provider shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quotefeed_core::{Candle, Interval, MarketDataProvider, ProviderError, Quote, SymbolMatch};

enum Mode {
    Serve(Vec<Candle>),
    Fail(ProviderError),
    Hang,
}

pub(crate) struct ScriptedProvider {
    mode: Mode,
    prices: Mutex<HashMap<String, f64>>,
    failing_symbols: Mutex<HashMap<String, ProviderError>>,
    candle_calls: AtomicUsize,
    quote_calls: AtomicUsize,
    last_range: Mutex<Option<(i64, i64)>>,
}

impl ScriptedProvider {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            prices: Mutex::new(HashMap::new()),
            failing_symbols: Mutex::new(HashMap::new()),
            candle_calls: AtomicUsize::new(0),
            quote_calls: AtomicUsize::new(0),
            last_range: Mutex::new(None),
        }
    }

    pub fn with_candles(candles: Vec<Candle>) -> Self {
        Self::with_mode(Mode::Serve(candles))
    }

    pub fn failing(err: ProviderError) -> Self {
        Self::with_mode(Mode::Fail(err))
    }

    pub fn hanging() -> Self {
        Self::with_mode(Mode::Hang)
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices.lock().unwrap().insert(symbol.to_string(), price);
    }

    pub fn fail_symbol(&self, symbol: &str, err: ProviderError) {
        self.failing_symbols
            .lock()
            .unwrap()
            .insert(symbol.to_string(), err);
    }

    pub fn candle_calls(&self) -> usize {
        self.candle_calls.load(Ordering::SeqCst)
    }

    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    pub fn last_range(&self) -> Option<(i64, i64)> {
        *self.last_range.lock().unwrap()
    }

    async fn gate(&self) -> Result<(), ProviderError> {
        match &self.mode {
            Mode::Serve(_) => Ok(()),
            Mode::Fail(err) => Err(err.clone()),
            Mode::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    async fn get_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        if let Some(err) = self.failing_symbols.lock().unwrap().get(symbol) {
            return Err(err.clone());
        }

        let price = self
            .prices
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .unwrap_or(100.0);
        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            change: 0.0,
            change_percent: 0.0,
            high: price,
            low: price,
            open: price,
            previous_close: price,
            volume: 1_000.0,
            timestamp_ms: (price * 1_000.0) as i64,
        })
    }

    async fn get_candles(
        &self,
        _symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        _interval: Interval,
    ) -> Result<Vec<Candle>, ProviderError> {
        self.candle_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_range.lock().unwrap() = Some((from.timestamp_millis(), to.timestamp_millis()));
        self.gate().await?;

        match &self.mode {
            Mode::Serve(candles) => Ok(candles.clone()),
            _ => Ok(vec![]),
        }
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, ProviderError> {
        self.gate().await?;
        Ok(vec![SymbolMatch {
            symbol: query.to_uppercase(),
            display_symbol: query.to_uppercase(),
            description: "Scripted".to_string(),
            kind: "Common Stock".to_string(),
        }])
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
