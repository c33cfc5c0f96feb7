//! Core types and traits for the quote feed.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Quote, Candle, CandleSeries, Interval)
//! - Indicator request and result types
//! - Wire messages for the control channel and the calculate boundary
//! - The provider and clock seams shared by every other crate

pub mod error;
pub mod traits;
pub mod types;

pub use error::{FeedError, FeedResult, HubError, IndicatorError, ProviderError};
pub use traits::*;
pub use types::*;
