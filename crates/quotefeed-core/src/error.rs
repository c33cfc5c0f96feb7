//! Error types for the quote feed.

use thiserror::Error;

/// Top-level error surfaced to callers of the service boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FeedError {
    /// HTTP-equivalent status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            FeedError::InvalidParameter(_) => 400,
            FeedError::ProviderUnavailable(_) => 502,
            FeedError::RateLimited { .. } => 503,
            FeedError::Config(_) | FeedError::Transport(_) | FeedError::Internal(_) => 500,
        }
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FeedError::ProviderUnavailable(_) | FeedError::RateLimited { .. }
        )
    }

    /// Retry hint in seconds, if any.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            FeedError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

impl From<IndicatorError> for FeedError {
    fn from(err: IndicatorError) -> Self {
        match err {
            IndicatorError::InvalidParameter(msg) => FeedError::InvalidParameter(msg),
        }
    }
}

impl From<ProviderError> for FeedError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited { retry_after_secs } => {
                FeedError::RateLimited { retry_after_secs }
            }
            other => FeedError::ProviderUnavailable(other.to_string()),
        }
    }
}

/// Indicator calculation errors.
///
/// Insufficient data is never an error: it is encoded as an empty
/// sequence or an undefined prefix in the output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Upstream market data provider errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Provider timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("No data for symbol: {0}")]
    NoData(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// Whether the failure is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. }
                | ProviderError::Unavailable(_)
                | ProviderError::Timeout { .. }
        )
    }
}

/// Subscription hub errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HubError {
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<HubError> for FeedError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::InvalidSymbol(s) => FeedError::InvalidParameter(format!("invalid symbol {s:?}")),
            HubError::UnknownConnection(id) => FeedError::Transport(format!("unknown connection {id}")),
            HubError::Transport(msg) => FeedError::Transport(msg),
        }
    }
}

/// Result type alias for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;
