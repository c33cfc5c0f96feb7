//! Core traits for the quote feed.

mod clock;
mod provider;

pub use clock::{Clock, ManualClock, SystemClock};
pub use provider::MarketDataProvider;
