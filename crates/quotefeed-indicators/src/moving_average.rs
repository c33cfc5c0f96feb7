//! Moving average indicators.

use quotefeed_core::{check_period, IndicatorError};

use crate::{simd, UNDEFINED};

/// Simple Moving Average (SMA).
///
/// Output has the same length as `prices`. Entries before index
/// `period - 1` are undefined; entry `i` is the arithmetic mean of
/// `prices[i + 1 - period..=i]`.
pub fn sma(prices: &[f64], period: usize) -> Result<Vec<f64>, IndicatorError> {
    check_period("period", period)?;

    let mut result = vec![UNDEFINED; prices.len()];
    if prices.len() < period {
        return Ok(result);
    }

    // Each window is summed on its own so one bad sample only poisons the
    // windows that contain it.
    for (i, window) in prices.windows(period).enumerate() {
        result[i + period - 1] = simd::mean(window);
    }

    Ok(result)
}

/// Exponential Moving Average (EMA).
///
/// Smoothing factor `k = 2 / (period + 1)`, seeded with the first raw
/// price rather than an SMA of the first `period` prices. The warm-up
/// bias this introduces is intentional: MACD and every other EMA-derived
/// value depend on it.
pub fn ema(prices: &[f64], period: usize) -> Result<Vec<f64>, IndicatorError> {
    check_period("period", period)?;

    let Some(&first) = prices.first() else {
        return Ok(vec![]);
    };

    let k = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(prices.len());
    let mut ema = first;
    result.push(ema);

    for &price in &prices[1..] {
        ema = (price - ema) * k + ema;
        result.push(ema);
    }

    Ok(result)
}
