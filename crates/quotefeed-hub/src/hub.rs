//! Connection registry and per-symbol interest index.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use quotefeed_config::{HubSettings, OverflowPolicy};
use quotefeed_core::{normalize_symbol, HubError, Quote, ServerMessage};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::{ConnectionHandle, ConnectionId};

/// Runtime hub configuration.
#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
    pub overflow_policy: OverflowPolicy,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::from(&HubSettings::default())
    }
}

impl From<&HubSettings> for HubConfig {
    fn from(settings: &HubSettings) -> Self {
        Self {
            outbound_buffer: settings.outbound_buffer.max(1),
            overflow_policy: settings.overflow_policy,
        }
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    /// Subscribers the message was queued for
    pub delivered: usize,
    /// Subscribers whose full queue dropped the message
    pub dropped: usize,
    /// Subscribers removed during this fan-out
    pub disconnected: usize,
}

/// Registry counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub connections: usize,
    pub symbols: usize,
    pub subscriptions: usize,
}

struct ConnectionEntry {
    tx: mpsc::Sender<ServerMessage>,
    symbols: HashSet<String>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct HubState {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    /// Symbol to subscribed connections; a symbol is present only while it
    /// has at least one subscriber.
    interest: HashMap<String, HashSet<ConnectionId>>,
}

impl HubState {
    /// Detach a connection and return the symbols that lost their last
    /// subscriber.
    fn remove_connection(&mut self, id: ConnectionId) -> Option<(CancellationToken, Vec<String>)> {
        let entry = self.connections.remove(&id)?;
        let mut orphaned = Vec::new();

        for symbol in entry.symbols {
            if let Some(subscribers) = self.interest.get_mut(&symbol) {
                subscribers.remove(&id);
                if subscribers.is_empty() {
                    self.interest.remove(&symbol);
                    orphaned.push(symbol);
                }
            }
        }

        orphaned.sort();
        Some((entry.cancel, orphaned))
    }
}

/// Tracks subscriptions and fans quote updates out to interested
/// connections.
///
/// # Example
///
/// ```rust
/// use quotefeed_hub::{HubConfig, SubscriptionHub};
///
/// let hub = SubscriptionHub::new(HubConfig::default());
/// let conn = hub.connect();
///
/// assert!(hub.subscribe(conn.id, "aapl").unwrap());
/// // Subscribing again is a no-op
/// assert!(!hub.subscribe(conn.id, "AAPL").unwrap());
/// assert_eq!(hub.active_symbols(), vec!["AAPL".to_string()]);
///
/// // One unsubscribe is enough
/// assert!(hub.unsubscribe(conn.id, "AAPL").unwrap());
/// assert!(hub.active_symbols().is_empty());
/// ```
pub struct SubscriptionHub {
    state: RwLock<HubState>,
    config: HubConfig,
}

impl SubscriptionHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            state: RwLock::new(HubState::default()),
            config,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a new connection with an empty subscription set.
    pub fn connect(&self) -> ConnectionHandle {
        let id = ConnectionId::new();
        let (tx, receiver) = mpsc::channel(self.config.outbound_buffer);
        let cancel = CancellationToken::new();

        self.state.write().connections.insert(
            id,
            ConnectionEntry {
                tx,
                symbols: HashSet::new(),
                cancel: cancel.clone(),
            },
        );
        debug!(connection = %id, "Connection registered");

        ConnectionHandle {
            id,
            receiver,
            cancel,
        }
    }

    /// Add `symbol` to the connection's interest set.
    ///
    /// Returns `false` if it was already subscribed.
    pub fn subscribe(&self, id: ConnectionId, symbol: &str) -> Result<bool, HubError> {
        let symbol = normalize_symbol(symbol)?;
        let mut state = self.state.write();

        let entry = state
            .connections
            .get_mut(&id)
            .ok_or_else(|| HubError::UnknownConnection(id.to_string()))?;
        if !entry.symbols.insert(symbol.clone()) {
            return Ok(false);
        }

        let subscribers = state.interest.entry(symbol.clone()).or_default();
        subscribers.insert(id);
        let first = subscribers.len() == 1;
        drop(state);

        debug!(connection = %id, symbol = %symbol, first, "Subscribed");
        Ok(true)
    }

    /// Remove `symbol` from the connection's interest set.
    ///
    /// Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: ConnectionId, symbol: &str) -> Result<bool, HubError> {
        let symbol = normalize_symbol(symbol)?;
        let mut state = self.state.write();

        let entry = state
            .connections
            .get_mut(&id)
            .ok_or_else(|| HubError::UnknownConnection(id.to_string()))?;
        if !entry.symbols.remove(&symbol) {
            return Ok(false);
        }

        if let Some(subscribers) = state.interest.get_mut(&symbol) {
            subscribers.remove(&id);
            if subscribers.is_empty() {
                state.interest.remove(&symbol);
            }
        }
        drop(state);

        debug!(connection = %id, symbol = %symbol, "Unsubscribed");
        Ok(true)
    }

    /// Drop a connection and all of its subscriptions.
    ///
    /// Cancels the connection's token and closes its queue. Returns the
    /// symbols that no longer have any subscriber. Unknown ids are ignored.
    pub fn on_disconnect(&self, id: ConnectionId) -> Vec<String> {
        let removed = self.state.write().remove_connection(id);

        match removed {
            Some((cancel, orphaned)) => {
                cancel.cancel();
                info!(connection = %id, orphaned = orphaned.len(), "Connection removed");
                orphaned
            }
            None => Vec::new(),
        }
    }

    /// Queue a direct reply for one connection.
    pub fn deliver(&self, id: ConnectionId, message: ServerMessage) -> Result<(), HubError> {
        let tx = self
            .state
            .read()
            .connections
            .get(&id)
            .map(|entry| entry.tx.clone())
            .ok_or_else(|| HubError::UnknownConnection(id.to_string()))?;

        match tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                if self.config.overflow_policy == OverflowPolicy::Disconnect {
                    self.on_disconnect(id);
                }
                Err(HubError::Transport(format!("outbound queue full for {id}")))
            }
            Err(TrySendError::Closed(_)) => {
                self.on_disconnect(id);
                Err(HubError::Transport(format!("connection {id} closed")))
            }
        }
    }

    /// Push a quote to every connection subscribed to its symbol.
    ///
    /// Failures are isolated per subscriber: a full queue is handled per
    /// the overflow policy, a closed one removes that subscriber.
    pub fn on_quote_update(&self, quote: &Quote) -> BroadcastReport {
        let targets: Vec<(ConnectionId, mpsc::Sender<ServerMessage>)> = {
            let state = self.state.read();
            let Some(subscribers) = state.interest.get(&quote.symbol) else {
                return BroadcastReport::default();
            };
            subscribers
                .iter()
                .filter_map(|id| state.connections.get(id).map(|e| (*id, e.tx.clone())))
                .collect()
        };

        let mut report = BroadcastReport::default();
        let mut dead = Vec::new();

        for (id, tx) in targets {
            let message = ServerMessage::Quote { data: quote.clone() };
            match tx.try_send(message) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => match self.config.overflow_policy {
                    OverflowPolicy::DropMessage => {
                        debug!(connection = %id, symbol = %quote.symbol, "Outbound queue full, dropping quote");
                        report.dropped += 1;
                    }
                    OverflowPolicy::Disconnect => {
                        warn!(connection = %id, symbol = %quote.symbol, "Outbound queue full, disconnecting");
                        dead.push(id);
                    }
                },
                Err(TrySendError::Closed(_)) => {
                    debug!(connection = %id, "Outbound queue closed");
                    dead.push(id);
                }
            }
        }

        for id in dead {
            self.on_disconnect(id);
            report.disconnected += 1;
        }

        report
    }

    /// Symbols with at least one subscriber, sorted.
    pub fn active_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.state.read().interest.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Symbols a connection is subscribed to, sorted.
    pub fn symbols_for(&self, id: ConnectionId) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .state
            .read()
            .connections
            .get(&id)
            .map(|e| e.symbols.iter().cloned().collect())
            .unwrap_or_default();
        symbols.sort();
        symbols
    }

    /// Number of connections subscribed to `symbol`.
    pub fn subscribers_of(&self, symbol: &str) -> usize {
        let Ok(symbol) = normalize_symbol(symbol) else {
            return 0;
        };
        self.state
            .read()
            .interest
            .get(&symbol)
            .map_or(0, HashSet::len)
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.state.read().connections.contains_key(&id)
    }

    pub fn stats(&self) -> HubStats {
        let state = self.state.read();
        HubStats {
            connections: state.connections.len(),
            symbols: state.interest.len(),
            subscriptions: state.connections.values().map(|e| e.symbols.len()).sum(),
        }
    }
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}
