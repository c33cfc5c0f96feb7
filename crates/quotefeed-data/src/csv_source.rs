//! Offline CSV provider.
//!
//! Serves `{dir}/{SYMBOL}.csv` files through the provider interface, so
//! the whole stack can run without network access.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use quotefeed_core::{
    normalize_symbol, Candle, Interval, MarketDataProvider, ProviderError, Quote, SymbolMatch,
};
use serde::Deserialize;
use tracing::debug;

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", default)]
    volume: f64,
}

/// Provider backed by a directory of per-symbol CSV files.
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    /// Create a provider over `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ProviderError::Configuration(format!(
                "CSV directory not found: {}",
                dir.display()
            )));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// File backing `symbol`. Anything that is not a plain ticker has no
    /// file, so the lookup can never leave `dir`.
    fn path_for(&self, symbol: &str) -> Result<PathBuf, ProviderError> {
        let symbol =
            normalize_symbol(symbol).map_err(|_| ProviderError::NoData(symbol.to_string()))?;
        Ok(self.dir.join(format!("{symbol}.csv")))
    }

    /// Load every candle for a symbol, oldest first.
    ///
    /// File and CSV work runs on the blocking pool.
    pub async fn load_all(&self, symbol: &str) -> Result<Vec<Candle>, ProviderError> {
        let path = self.path_for(symbol)?;
        let symbol = symbol.to_string();
        blocking(move || {
            if !path.is_file() {
                return Err(ProviderError::NoData(symbol));
            }
            load_from_path(&path)
        })
        .await
    }
}

async fn blocking<T, F>(work: F) -> Result<T, ProviderError>
where
    F: FnOnce() -> Result<T, ProviderError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ProviderError::Unavailable(format!("CSV worker failed: {e}")))?
}

fn list_symbols(dir: &Path, needle: &str) -> Result<Vec<SymbolMatch>, ProviderError> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| ProviderError::Unavailable(e.to_string()))?;

    let mut hits: Vec<SymbolMatch> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .filter_map(|path| path.file_stem()?.to_str().map(str::to_uppercase))
        .filter(|symbol| symbol.contains(needle))
        .map(|symbol| SymbolMatch {
            display_symbol: symbol.clone(),
            description: format!("{symbol} (CSV)"),
            kind: "CSV".to_string(),
            symbol,
        })
        .collect();

    hits.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(hits)
}

fn load_from_path(path: &Path) -> Result<Vec<Candle>, ProviderError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| ProviderError::Parse(e.to_string()))?;

    let mut candles = Vec::new();

    for result in reader.deserialize() {
        let record: CsvRecord = result.map_err(|e| ProviderError::Parse(e.to_string()))?;
        let timestamp = parse_timestamp(&record.date)?;

        candles.push(Candle::new(
            timestamp,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        ));
    }

    candles.sort_by_key(|c| c.timestamp);
    debug!(path = %path.display(), rows = candles.len(), "Loaded CSV candles");

    Ok(candles)
}

/// Parse the date formats commonly found in exported price files.
fn parse_timestamp(date_str: &str) -> Result<i64, ProviderError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Ok(dt.timestamp_millis());
    }

    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M"];
    for format in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    for format in date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt.and_utc().timestamp_millis());
            }
        }
    }

    // Unix timestamp; assume milliseconds past 10 digits
    if let Ok(ts) = date_str.parse::<i64>() {
        return Ok(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }

    Err(ProviderError::Parse(format!("Could not parse date: {date_str}")))
}

#[async_trait]
impl MarketDataProvider for CsvProvider {
    async fn get_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        let symbol =
            normalize_symbol(symbol).map_err(|_| ProviderError::NoData(symbol.to_string()))?;
        let candles = self.load_all(&symbol).await?;
        let last = candles
            .last()
            .ok_or_else(|| ProviderError::NoData(symbol.to_string()))?;
        let previous_close = candles
            .len()
            .checked_sub(2)
            .map(|i| candles[i].close)
            .unwrap_or(last.open);

        let change = last.close - previous_close;
        let change_percent = if previous_close != 0.0 {
            change / previous_close * 100.0
        } else {
            0.0
        };

        Ok(Quote {
            symbol,
            price: last.close,
            change,
            change_percent,
            high: last.high,
            low: last.low,
            open: last.open,
            previous_close,
            volume: last.volume,
            timestamp_ms: last.timestamp,
        })
    }

    async fn get_candles(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        _interval: Interval,
    ) -> Result<Vec<Candle>, ProviderError> {
        let (from_ms, to_ms) = (from.timestamp_millis(), to.timestamp_millis());
        let candles = match self.load_all(symbol).await {
            Ok(candles) => candles,
            Err(ProviderError::NoData(_)) => return Ok(vec![]),
            Err(e) => return Err(e),
        };

        Ok(candles
            .into_iter()
            .filter(|c| c.timestamp >= from_ms && c.timestamp <= to_ms)
            .collect())
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, ProviderError> {
        let needle = query.trim().to_uppercase();
        let dir = self.dir.clone();
        blocking(move || list_symbols(&dir, &needle)).await
    }

    fn name(&self) -> &str {
        "csv"
    }
}
