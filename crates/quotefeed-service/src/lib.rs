//! Service layer.
//!
//! Wires the provider, cache, indicator engine and subscription hub into
//! the three request paths of the feed:
//! - [`IndicatorService`]: point-in-time indicator calculations
//! - [`QuotePoller`]: timer-driven quote ingestion and broadcast
//! - [`Session`]: per-connection subscribe/unsubscribe handling

mod config;
mod indicator_service;
mod poller;
mod session;

#[cfg(test)]
mod testing;

pub use config::{PollerConfig, ServiceConfig};
pub use indicator_service::IndicatorService;
pub use poller::{PollReport, QuotePoller};
pub use session::Session;

use std::future::Future;
use std::time::Duration;

use quotefeed_core::{FeedResult, ProviderError};
use tracing::{debug, warn};

/// Await a provider call with a deadline, translating failures into the
/// caller-facing taxonomy.
pub(crate) async fn bounded<T, F>(limit: Duration, fut: F) -> FeedResult<T>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    let error = match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(e)) => e,
        Err(_) => ProviderError::Timeout {
            after_ms: limit.as_millis() as u64,
        },
    };

    if error.is_retryable() {
        debug!(error = %error, "Transient provider failure");
    } else {
        warn!(error = %error, "Provider call failed");
    }
    Err(error.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotefeed_core::FeedError;

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let result: FeedResult<()> = bounded(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(FeedError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_bounded_translates_errors() {
        let limited: FeedResult<()> = bounded(Duration::from_secs(1), async {
            Err(ProviderError::RateLimited { retry_after_secs: 7 })
        })
        .await;
        assert!(matches!(
            limited,
            Err(FeedError::RateLimited { retry_after_secs: 7 })
        ));

        let value = bounded(Duration::from_secs(1), async { Ok::<_, ProviderError>(3) }).await;
        assert_eq!(value.unwrap(), 3);
    }
}
