//! Subscription hub.
//!
//! Tracks which connections want which symbols and pushes quote updates
//! to exactly those connections. Each connection owns a bounded outbound
//! queue; a slow or dead subscriber never blocks delivery to the others.

mod connection;
mod hub;

pub use connection::{ConnectionHandle, ConnectionId};
pub use hub::{BroadcastReport, HubConfig, HubStats, SubscriptionHub};
pub use quotefeed_config::OverflowPolicy;
