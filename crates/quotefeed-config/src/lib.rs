//! Configuration management.
//!
//! Settings come from an optional TOML file overlaid with
//! `QUOTEFEED__SECTION__KEY` environment variables. Every section has
//! defaults, so an empty file (or no file) is a valid configuration.

mod settings;

pub use settings::{
    AppConfig, AppSettings, CacheSettings, HubSettings, LoggingConfig, OverflowPolicy,
    PollerSettings, ProviderKind, ProviderSettings, ServerSettings, ServiceSettings,
};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from file and environment.
///
/// When `path` is `None` only defaults and the environment apply.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, SettingsError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    let config = builder
        .add_source(
            Environment::with_prefix("QUOTEFEED")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotefeed_core::Interval;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let file = write_config("");
        let config = load_config(Some(file.path())).unwrap();

        assert_eq!(config.cache.quote_ttl_secs, 15);
        assert_eq!(config.hub.overflow_policy, OverflowPolicy::DropMessage);
        assert_eq!(config.provider.kind, ProviderKind::Finnhub);
        assert_eq!(config.service.default_interval, Interval::Daily);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_sections() {
        let file = write_config(
            r#"
[provider]
kind = "csv"
csv_dir = "./data"

[hub]
overflow_policy = "disconnect"

[service]
default_interval = "1h"
max_concurrent_calculations = 2
"#,
        );
        let config = load_config(Some(file.path())).unwrap();

        assert_eq!(config.provider.kind, ProviderKind::Csv);
        assert_eq!(config.provider.csv_dir.as_deref(), Some("./data"));
        assert_eq!(config.provider.request_timeout_ms, 10_000);
        assert_eq!(config.hub.overflow_policy, OverflowPolicy::Disconnect);
        assert_eq!(config.hub.outbound_buffer, 256);
        assert_eq!(config.service.default_interval, Interval::Hour1);
        assert_eq!(config.service.max_concurrent_calculations, 2);
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_config(Some(Path::new("/nonexistent/quotefeed.toml")));
        assert!(matches!(result, Err(SettingsError::Load(_))));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = AppConfig::default();
        config.poller.interval_ms = 0;
        assert!(matches!(config.validate(), Err(SettingsError::Invalid(_))));

        let mut config = AppConfig::default();
        config.hub.outbound_buffer = 0;
        assert!(matches!(config.validate(), Err(SettingsError::Invalid(_))));

        let mut config = AppConfig::default();
        config.service.max_concurrent_calculations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unrepresentable_lookback() {
        let mut config = AppConfig::default();
        config.service.default_interval = Interval::Monthly;
        config.service.default_lookback_bars = u32::MAX;
        assert!(matches!(config.validate(), Err(SettingsError::Invalid(_))));

        config.service.default_lookback_bars = 1_200;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_csv_provider_requires_dir() {
        let mut config = AppConfig::default();
        config.provider.kind = ProviderKind::Csv;
        assert!(config.validate().is_err());

        config.provider.csv_dir = Some("./data".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_checked_in_defaults_match() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml");
        let config = load_config(Some(&path)).unwrap();
        let defaults = AppConfig::default();

        assert_eq!(config.cache.default_ttl_secs, defaults.cache.default_ttl_secs);
        assert_eq!(config.cache.negative_ttl_secs, defaults.cache.negative_ttl_secs);
        assert_eq!(config.poller.interval_ms, defaults.poller.interval_ms);
        assert_eq!(config.server.bind_addr, defaults.server.bind_addr);
        assert_eq!(config.service.default_lookback_bars, defaults.service.default_lookback_bars);
    }

    #[test]
    fn test_renders_toml() {
        let rendered = AppConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[cache]"));
        assert!(rendered.contains("overflow_policy = \"drop_message\""));
    }
}
