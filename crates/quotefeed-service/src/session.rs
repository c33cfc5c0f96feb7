//! Per-connection control channel handling.

use std::sync::Arc;

use quotefeed_core::{normalize_symbol, ClientMessage, HubError, ServerMessage};
use quotefeed_data::QuoteCache;
use quotefeed_hub::{ConnectionHandle, ConnectionId, SubscriptionHub};
use tracing::debug;

/// One subscriber connection.
///
/// The transport feeds inbound text frames to [`handle_text`] and drains the
/// [`ConnectionHandle`] returned by [`open`]. Dropping the session without
/// calling [`close`] still unregisters it.
///
/// [`handle_text`]: Session::handle_text
/// [`open`]: Session::open
/// [`close`]: Session::close
pub struct Session {
    id: ConnectionId,
    hub: Arc<SubscriptionHub>,
    cache: Arc<QuoteCache>,
    closed: bool,
}

impl Session {
    /// Register a new connection with the hub.
    pub fn open(hub: Arc<SubscriptionHub>, cache: Arc<QuoteCache>) -> (Self, ConnectionHandle) {
        let handle = hub.connect();
        let session = Self {
            id: handle.id,
            hub,
            cache,
            closed: false,
        };
        (session, handle)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Process one inbound control frame.
    ///
    /// Protocol errors are answered with an `error` message on the
    /// connection's own queue. An `Err` means the connection itself is gone
    /// and the transport should stop.
    pub fn handle_text(&self, text: &str) -> Result<(), HubError> {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                debug!(connection = %self.id, error = %e, "Malformed control message");
                return self.reply_error(format!("invalid message: {e}"));
            }
        };

        match message {
            ClientMessage::Subscribe { symbol } => self.subscribe(&symbol),
            ClientMessage::Unsubscribe { symbol } => self.unsubscribe(&symbol),
        }
    }

    fn subscribe(&self, raw: &str) -> Result<(), HubError> {
        let symbol = match normalize_symbol(raw) {
            Ok(symbol) => symbol,
            Err(e) => return self.reply_error(e.to_string()),
        };

        self.hub.subscribe(self.id, &symbol)?;
        self.send(ServerMessage::Subscribed {
            symbol: symbol.clone(),
        })?;

        // Warm start: the poller will refresh it on its next tick
        if let Some(quote) = self.cache.get_quote(&symbol) {
            self.send(ServerMessage::Quote { data: quote })?;
        }
        Ok(())
    }

    fn unsubscribe(&self, raw: &str) -> Result<(), HubError> {
        let symbol = match normalize_symbol(raw) {
            Ok(symbol) => symbol,
            Err(e) => return self.reply_error(e.to_string()),
        };

        self.hub.unsubscribe(self.id, &symbol)?;
        self.send(ServerMessage::Unsubscribed { symbol })
    }

    fn reply_error(&self, message: String) -> Result<(), HubError> {
        self.send(ServerMessage::Error { message })
    }

    /// Queue a reply. A reply dropped on a full queue is not fatal as long
    /// as the hub kept the connection.
    fn send(&self, message: ServerMessage) -> Result<(), HubError> {
        match self.hub.deliver(self.id, message) {
            Err(HubError::Transport(reason)) if self.hub.is_connected(self.id) => {
                debug!(connection = %self.id, %reason, "Reply dropped");
                Ok(())
            }
            other => other,
        }
    }

    /// Unregister the connection. Returns symbols left without subscribers.
    pub fn close(mut self) -> Vec<String> {
        self.closed = true;
        self.hub.on_disconnect(self.id)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            self.hub.on_disconnect(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotefeed_core::Quote;
    use quotefeed_data::CacheConfig;
    use quotefeed_hub::HubConfig;

    fn setup() -> (Arc<SubscriptionHub>, Arc<QuoteCache>) {
        (
            Arc::new(SubscriptionHub::new(HubConfig::default())),
            Arc::new(QuoteCache::new(CacheConfig::default())),
        )
    }

    fn quote(symbol: &str, price: f64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            price,
            change: 0.0,
            change_percent: 0.0,
            high: price,
            low: price,
            open: price,
            previous_close: price,
            volume: 0.0,
            timestamp_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_subscribe_acks_and_pushes_cached_quote() {
        let (hub, cache) = setup();
        cache.set_quote(&quote("AAPL", 190.0));
        let (session, mut handle) = Session::open(hub.clone(), cache);

        session
            .handle_text(r#"{"type":"subscribe","symbol":"aapl"}"#)
            .unwrap();

        assert_eq!(
            handle.receiver.try_recv().unwrap(),
            ServerMessage::Subscribed {
                symbol: "AAPL".into()
            }
        );
        assert!(matches!(
            handle.receiver.try_recv().unwrap(),
            ServerMessage::Quote { data } if data.price == 190.0
        ));
        assert_eq!(hub.symbols_for(session.id()), vec!["AAPL".to_string()]);
    }

    #[tokio::test]
    async fn test_subscribe_without_cached_quote_only_acks() {
        let (hub, cache) = setup();
        let (session, mut handle) = Session::open(hub, cache);

        session
            .handle_text(r#"{"type":"subscribe","symbol":"MSFT"}"#)
            .unwrap();

        assert!(matches!(
            handle.receiver.try_recv().unwrap(),
            ServerMessage::Subscribed { .. }
        ));
        assert!(handle.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_acks() {
        let (hub, cache) = setup();
        let (session, mut handle) = Session::open(hub.clone(), cache);

        session
            .handle_text(r#"{"type":"subscribe","symbol":"TSLA"}"#)
            .unwrap();
        session
            .handle_text(r#"{"type":"unsubscribe","symbol":"TSLA"}"#)
            .unwrap();

        handle.receiver.try_recv().unwrap();
        assert_eq!(
            handle.receiver.try_recv().unwrap(),
            ServerMessage::Unsubscribed {
                symbol: "TSLA".into()
            }
        );
        assert!(hub.active_symbols().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_input_yields_error_reply() {
        let (hub, cache) = setup();
        let (session, mut handle) = Session::open(hub, cache);

        for frame in [
            "not json",
            r#"{"type":"subscribe"}"#,
            r#"{"type":"launch","symbol":"AAPL"}"#,
            r#"{"type":"subscribe","symbol":"   "}"#,
        ] {
            session.handle_text(frame).unwrap();
            assert!(
                matches!(
                    handle.receiver.try_recv().unwrap(),
                    ServerMessage::Error { .. }
                ),
                "frame {frame:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_close_reports_orphans() {
        let (hub, cache) = setup();
        let (a, _ha) = Session::open(hub.clone(), cache.clone());
        let (b, _hb) = Session::open(hub.clone(), cache);

        a.handle_text(r#"{"type":"subscribe","symbol":"AAPL"}"#)
            .unwrap();
        a.handle_text(r#"{"type":"subscribe","symbol":"MSFT"}"#)
            .unwrap();
        b.handle_text(r#"{"type":"subscribe","symbol":"AAPL"}"#)
            .unwrap();

        assert_eq!(a.close(), vec!["MSFT".to_string()]);
        assert_eq!(hub.active_symbols(), vec!["AAPL".to_string()]);
    }

    #[tokio::test]
    async fn test_full_queue_is_not_fatal() {
        let hub = Arc::new(SubscriptionHub::new(HubConfig {
            outbound_buffer: 1,
            ..HubConfig::default()
        }));
        let cache = Arc::new(QuoteCache::new(CacheConfig::default()));
        let (session, mut handle) = Session::open(hub.clone(), cache);

        session
            .handle_text(r#"{"type":"subscribe","symbol":"AAPL"}"#)
            .unwrap();
        // Queue is full; the ack is dropped but the session survives
        session
            .handle_text(r#"{"type":"subscribe","symbol":"MSFT"}"#)
            .unwrap();

        assert!(hub.is_connected(session.id()));
        assert_eq!(hub.symbols_for(session.id()).len(), 2);
        assert!(handle.receiver.try_recv().is_ok());
        assert!(handle.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_transport_is_fatal() {
        let (hub, cache) = setup();
        let (session, handle) = Session::open(hub.clone(), cache);
        drop(handle);

        assert!(session
            .handle_text(r#"{"type":"subscribe","symbol":"AAPL"}"#)
            .is_err());
        assert!(!hub.is_connected(session.id()));
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let (hub, cache) = setup();
        let (session, handle) = Session::open(hub.clone(), cache);
        let id = session.id();

        drop(session);
        assert!(!hub.is_connected(id));
        assert!(handle.cancel.is_cancelled());
    }
}
