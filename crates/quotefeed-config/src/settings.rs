//! Configuration structures.

use quotefeed_core::{CandleRange, Interval};
use serde::{Deserialize, Serialize};

use crate::SettingsError;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub hub: HubSettings,
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub poller: PollerSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

impl AppConfig {
    /// Reject settings that would stall or disable a component.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let zero_checks: [(&str, u64); 11] = [
            ("cache.default_ttl_secs", self.cache.default_ttl_secs),
            ("cache.quote_ttl_secs", self.cache.quote_ttl_secs),
            ("cache.candles_ttl_secs", self.cache.candles_ttl_secs),
            ("cache.indicator_ttl_secs", self.cache.indicator_ttl_secs),
            ("cache.sweep_interval_secs", self.cache.sweep_interval_secs),
            ("hub.outbound_buffer", self.hub.outbound_buffer as u64),
            (
                "service.max_concurrent_calculations",
                self.service.max_concurrent_calculations as u64,
            ),
            ("service.fetch_timeout_ms", self.service.fetch_timeout_ms),
            ("poller.interval_ms", self.poller.interval_ms),
            (
                "poller.max_concurrent_fetches",
                self.poller.max_concurrent_fetches as u64,
            ),
            ("provider.request_timeout_ms", self.provider.request_timeout_ms),
        ];

        for (name, value) in zero_checks {
            if value == 0 {
                return Err(SettingsError::Invalid(format!("{name} must be greater than 0")));
            }
        }

        if self.service.default_lookback_bars == 0 {
            return Err(SettingsError::Invalid(
                "service.default_lookback_bars must be greater than 0".into(),
            ));
        }
        CandleRange::trailing(0, self.service.default_lookback_bars, self.service.default_interval)
            .map_err(|_| {
                SettingsError::Invalid(
                    "service.default_lookback_bars is too large for service.default_interval"
                        .into(),
                )
            })?;

        if self.provider.kind == ProviderKind::Csv && self.provider.csv_dir.is_none() {
            return Err(SettingsError::Invalid(
                "provider.csv_dir is required when provider.kind = \"csv\"".into(),
            ));
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(SettingsError::Invalid(format!(
                    "logging.format must be \"pretty\" or \"json\", got {other:?}"
                )))
            }
        }

        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        toml::to_string_pretty(self).map_err(|e| SettingsError::Invalid(e.to_string()))
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "quotefeed".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

/// Upstream market data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Finnhub,
    Csv,
}

/// Provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Directory of `{SYMBOL}.csv` files for the CSV provider
    pub csv_dir: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Finnhub,
            base_url: "https://finnhub.io/api/v1".to_string(),
            api_key_env: "FINNHUB_API_KEY".to_string(),
            csv_dir: None,
            request_timeout_ms: 10_000,
        }
    }
}

/// Cache TTLs and sweep cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub default_ttl_secs: u64,
    pub quote_ttl_secs: u64,
    pub candles_ttl_secs: u64,
    pub indicator_ttl_secs: u64,
    /// TTL for "no data" results; 0 disables negative caching
    pub negative_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_secs: 60,
            quote_ttl_secs: 15,
            candles_ttl_secs: 300,
            indicator_ttl_secs: 300,
            negative_ttl_secs: 30,
            sweep_interval_secs: 60,
        }
    }
}

/// What to do when a subscriber's outbound queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the message for that subscriber only
    #[default]
    DropMessage,
    /// Treat the subscriber as dead and remove it
    Disconnect,
}

/// Subscription hub settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSettings {
    pub outbound_buffer: usize,
    pub overflow_policy: OverflowPolicy,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            outbound_buffer: 256,
            overflow_policy: OverflowPolicy::DropMessage,
        }
    }
}

/// Indicator request service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub max_concurrent_calculations: usize,
    /// Bars fetched when a request has no explicit range
    pub default_lookback_bars: u32,
    pub default_interval: Interval,
    pub cache_results: bool,
    pub fetch_timeout_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            max_concurrent_calculations: 4,
            default_lookback_bars: 200,
            default_interval: Interval::Daily,
            cache_results: true,
            fetch_timeout_ms: 10_000,
        }
    }
}

/// Quote poller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerSettings {
    pub interval_ms: u64,
    pub max_concurrent_fetches: usize,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            max_concurrent_fetches: 8,
        }
    }
}

/// Network listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}
