//! OHLCV candle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Interval;
use crate::error::FeedError;

/// One OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time, Unix milliseconds
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Trading volume
    pub volume: f64,
}

impl Candle {
    /// Create a new candle.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

}

/// Time window of candles requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleRange {
    /// Inclusive start, Unix milliseconds
    pub from_ms: i64,
    /// Inclusive end, Unix milliseconds
    pub to_ms: i64,
    /// Bar interval
    #[serde(default)]
    pub interval: Interval,
}

impl CandleRange {
    /// Create a range.
    pub fn new(from_ms: i64, to_ms: i64, interval: Interval) -> Self {
        Self {
            from_ms,
            to_ms,
            interval,
        }
    }

    /// Range covering the last `bars` bars ending at the bar containing `now_ms`.
    ///
    /// Fails when the window reaches past the representable timestamps.
    pub fn trailing(now_ms: i64, bars: u32, interval: Interval) -> Result<Self, FeedError> {
        let to_ms = interval.align_down(now_ms);
        let from_ms = interval
            .as_millis()
            .checked_mul(i64::from(bars))
            .and_then(|span| to_ms.checked_sub(span))
            .filter(|from| DateTime::from_timestamp_millis(*from).is_some())
            .ok_or_else(|| {
                FeedError::InvalidParameter(format!("{bars} bars of {interval} is out of range"))
            })?;
        Ok(Self::new(from_ms, to_ms, interval))
    }

    /// Segment used to build cache keys.
    pub fn cache_key_part(&self) -> String {
        format!("{}:{}:{}", self.interval, self.from_ms, self.to_ms)
    }

    /// Start as a DateTime.
    pub fn from_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.from_ms).unwrap_or_default()
    }

    /// End as a DateTime.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.to_ms).unwrap_or_default()
    }
}

/// Ordered candle sequence for one (symbol, interval).
///
/// Candles are strictly ascending by timestamp with no duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    /// Symbol identifier
    pub symbol: String,
    /// Interval of the candles
    pub interval: Interval,
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Build a series, sorting by timestamp and keeping the last candle
    /// seen for any duplicated timestamp.
    pub fn new(symbol: impl Into<String>, interval: Interval, candles: Vec<Candle>) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            candles: normalize_candles(candles),
        }
    }

    /// Get the number of candles.
    #[inline]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Check if the series is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Get all candles as a slice.
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Extract close prices.
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Extract timestamps.
    pub fn timestamps(&self) -> Vec<i64> {
        self.candles.iter().map(|c| c.timestamp).collect()
    }

    /// Consume the series into its candles.
    pub fn into_candles(self) -> Vec<Candle> {
        self.candles
    }
}

/// Sort candles ascending and collapse duplicate timestamps (last wins).
pub fn normalize_candles(mut candles: Vec<Candle>) -> Vec<Candle> {
    // Stable sort keeps arrival order among equal timestamps.
    candles.sort_by_key(|c| c.timestamp);
    let mut out: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match out.last_mut() {
            Some(prev) if prev.timestamp == candle.timestamp => *prev = candle,
            _ => out.push(candle),
        }
    }
    out
}
