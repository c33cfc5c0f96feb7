//! Runtime configuration for the service components.

use std::time::Duration;

use quotefeed_config::{PollerSettings, ServiceSettings};
use quotefeed_core::Interval;

/// Indicator service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Size of the CPU worker pool for indicator computation
    pub max_concurrent_calculations: usize,
    /// Bars fetched when a request carries no range
    pub default_lookback_bars: u32,
    pub default_interval: Interval,
    /// Cache computed results by fingerprint and range
    pub cache_results: bool,
    /// Upper bound on one provider call
    pub fetch_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from(&ServiceSettings::default())
    }
}

impl From<&ServiceSettings> for ServiceConfig {
    fn from(settings: &ServiceSettings) -> Self {
        Self {
            max_concurrent_calculations: settings.max_concurrent_calculations.max(1),
            default_lookback_bars: settings.default_lookback_bars,
            default_interval: settings.default_interval,
            cache_results: settings.cache_results,
            fetch_timeout: Duration::from_millis(settings.fetch_timeout_ms),
        }
    }
}

/// Quote poller configuration.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub max_concurrent_fetches: usize,
    /// Upper bound on one quote fetch
    pub fetch_timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::new(&PollerSettings::default(), &ServiceSettings::default())
    }
}

impl PollerConfig {
    pub fn new(poller: &PollerSettings, service: &ServiceSettings) -> Self {
        Self {
            interval: Duration::from_millis(poller.interval_ms.max(1)),
            max_concurrent_fetches: poller.max_concurrent_fetches.max(1),
            fetch_timeout: Duration::from_millis(service.fetch_timeout_ms),
        }
    }
}
