//! Core data types for the quote feed.

mod candle;
mod indicator;
mod interval;
mod message;
mod quote;

pub use candle::{normalize_candles, Candle, CandleRange, CandleSeries};
pub use indicator::{
    check_period, IndicatorKind, IndicatorRequest, IndicatorResult, IndicatorSeries, IndicatorSpec,
    ResolvedRequest,
};
pub use interval::Interval;
pub use message::{CalculateResponse, ClientMessage, ErrorBody, ServerMessage};
pub use quote::{normalize_symbol, Quote, SymbolMatch, MAX_SYMBOL_LEN};
