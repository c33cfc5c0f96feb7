//! Serve command: quote poller plus the WebSocket endpoint.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use quotefeed_config::AppConfig;
use quotefeed_data::{build_provider, CacheConfig, QuoteCache};
use quotefeed_hub::{HubConfig, SubscriptionHub};
use quotefeed_service::{PollerConfig, QuotePoller};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::ServeArgs;
use crate::ws;

pub async fn run(args: ServeArgs, config: &AppConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let provider =
        build_provider(&config.provider).context("Failed to create market data provider")?;
    let cache = Arc::new(QuoteCache::new(CacheConfig::from(&config.cache)));
    if !cache.is_healthy() {
        bail!("Quote cache failed its startup health check");
    }
    let hub = Arc::new(SubscriptionHub::new(HubConfig::from(&config.hub)));
    let shutdown = CancellationToken::new();

    let sweeper = cache.spawn_sweeper(cache.config().sweep_interval, shutdown.child_token());
    let poller = Arc::new(QuotePoller::new(
        Arc::clone(&provider),
        Arc::clone(&cache),
        Arc::clone(&hub),
        PollerConfig::new(&config.poller, &config.service),
    ));
    let poller_task = poller.spawn(shutdown.child_token());

    let bind = args.bind.unwrap_or_else(|| config.server.bind_addr.clone());
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(addr = %bind, provider = provider.name(), "Quote feed listening");

    let server = tokio::spawn(ws::accept_loop(
        listener,
        Arc::clone(&hub),
        Arc::clone(&cache),
        shutdown.clone(),
    ));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutdown requested");
    shutdown.cancel();

    if let Err(e) = server.await {
        warn!(error = %e, "Listener task failed");
    }
    if let Err(e) = poller_task.await {
        warn!(error = %e, "Poller task failed");
    }
    sweeper.shutdown().await;

    let hub_stats = hub.stats();
    let cache_stats = cache.stats();
    info!(
        connections = hub_stats.connections,
        cache_entries = cache_stats.entries,
        "Stopped"
    );
    Ok(())
}
