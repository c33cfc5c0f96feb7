//! Technical indicators over price series.
//!
//! Pure, stateless functions:
//! - Moving averages (SMA, EMA)
//! - Momentum indicators (RSI, MACD)
//! - Volatility indicators (population standard deviation, Bollinger Bands)
//!
//! Every function validates its periods and fails only with
//! `IndicatorError::InvalidParameter`. Too little data is never an error:
//! it shows up as an empty output or as a prefix of undefined values
//! (`NaN`), so callers can render "not ready yet" without special cases.

mod compute;
pub mod momentum;
pub mod moving_average;
pub mod simd;
pub mod volatility;

pub use compute::compute;
pub use momentum::{macd, rsi, MacdOutput};
pub use moving_average::{ema, sma};
pub use volatility::{bollinger_bands, std_dev, BollingerOutput};

/// Marker for "not enough samples yet".
pub const UNDEFINED: f64 = f64::NAN;
