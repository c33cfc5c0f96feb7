//! Finnhub market data integration.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quotefeed_config::ProviderSettings;
use quotefeed_core::{Candle, Interval, MarketDataProvider, ProviderError, Quote, SymbolMatch};
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

/// Retry hint used when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Finnhub API configuration.
#[derive(Debug, Clone)]
pub struct FinnhubConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl FinnhubConfig {
    /// Create config directly with a key.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build from provider settings, reading the key from the named
    /// environment variable.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            ProviderError::Configuration(format!("{} not set", settings.api_key_env))
        })?;

        Ok(Self::new(api_key, settings.base_url.clone())
            .with_timeout(Duration::from_millis(settings.request_timeout_ms)))
    }
}

/// Finnhub API response types
#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    c: f64,
    d: Option<f64>,
    dp: Option<f64>,
    h: f64,
    l: f64,
    o: f64,
    pc: f64,
    #[serde(default)]
    t: i64,
}

#[derive(Debug, Deserialize)]
struct FinnhubCandles {
    s: String,
    #[serde(default)]
    t: Vec<i64>,
    #[serde(default)]
    o: Vec<f64>,
    #[serde(default)]
    h: Vec<f64>,
    #[serde(default)]
    l: Vec<f64>,
    #[serde(default)]
    c: Vec<f64>,
    #[serde(default)]
    v: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct FinnhubSearch {
    #[serde(default)]
    result: Vec<FinnhubSearchHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinnhubSearchHit {
    description: String,
    display_symbol: String,
    symbol: String,
    #[serde(rename = "type", default)]
    kind: String,
}

/// Finnhub REST client.
pub struct FinnhubProvider {
    config: FinnhubConfig,
    client: Client,
}

impl FinnhubProvider {
    /// Create a new Finnhub client.
    pub fn new(config: FinnhubConfig) -> Result<Self, ProviderError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "X-Finnhub-Token",
            header::HeaderValue::from_str(&config.api_key)
                .map_err(|e| ProviderError::Configuration(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create from provider settings.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Self::new(FinnhubConfig::from_settings(settings)?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        debug!(%url, "Finnhub request");

        let resp = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let resp = check_status(resp).await?;
        resp.json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }

    fn transport_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout {
                after_ms: self.config.request_timeout.as_millis() as u64,
            }
        } else {
            ProviderError::Unavailable(err.to_string())
        }
    }
}

async fn check_status(resp: Response) -> Result<Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = resp
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        warn!(retry_after_secs, "Finnhub rate limit hit");
        return Err(ProviderError::RateLimited { retry_after_secs });
    }

    let text = resp.text().await.unwrap_or_default();
    Err(ProviderError::Unavailable(format!("{status}: {text}")))
}

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    async fn get_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        let raw: FinnhubQuote = self
            .get_json("/quote", &[("symbol", symbol.to_string())])
            .await?;

        // Unknown symbols come back as an all-zero quote
        if raw.c == 0.0 && raw.t == 0 {
            return Err(ProviderError::NoData(symbol.to_string()));
        }

        let change = raw.d.unwrap_or(raw.c - raw.pc);
        let change_percent = raw.dp.unwrap_or_else(|| {
            if raw.pc != 0.0 {
                change / raw.pc * 100.0
            } else {
                0.0
            }
        });

        Ok(Quote {
            symbol: symbol.to_string(),
            price: raw.c,
            change,
            change_percent,
            high: raw.h,
            low: raw.l,
            open: raw.o,
            previous_close: raw.pc,
            volume: 0.0,
            timestamp_ms: raw.t * 1000,
        })
    }

    async fn get_candles(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        interval: Interval,
    ) -> Result<Vec<Candle>, ProviderError> {
        let raw: FinnhubCandles = self
            .get_json(
                "/stock/candle",
                &[
                    ("symbol", symbol.to_string()),
                    ("resolution", interval.provider_resolution().to_string()),
                    ("from", from.timestamp().to_string()),
                    ("to", to.timestamp().to_string()),
                ],
            )
            .await?;

        if raw.s == "no_data" {
            return Ok(vec![]);
        }
        if raw.s != "ok" {
            return Err(ProviderError::Unavailable(format!("candle status {}", raw.s)));
        }

        let n = raw.t.len();
        if [raw.o.len(), raw.h.len(), raw.l.len(), raw.c.len()]
            .iter()
            .any(|&len| len != n)
        {
            return Err(ProviderError::Parse(format!(
                "ragged candle arrays for {symbol}"
            )));
        }

        let candles = (0..n)
            .map(|i| {
                Candle::new(
                    raw.t[i] * 1000,
                    raw.o[i],
                    raw.h[i],
                    raw.l[i],
                    raw.c[i],
                    raw.v.get(i).copied().unwrap_or(0.0),
                )
            })
            .collect();

        Ok(candles)
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, ProviderError> {
        let raw: FinnhubSearch = self
            .get_json("/search", &[("q", query.to_string())])
            .await?;

        Ok(raw
            .result
            .into_iter()
            .map(|hit| SymbolMatch {
                symbol: hit.symbol,
                display_symbol: hit.display_symbol,
                description: hit.description,
                kind: hit.kind,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "finnhub"
    }
}
