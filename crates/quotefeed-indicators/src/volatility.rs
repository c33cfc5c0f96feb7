//! Volatility indicators.

use quotefeed_core::{check_period, IndicatorError};
use serde::Serialize;

use crate::moving_average::sma;
use crate::{simd, UNDEFINED};

/// Trailing-window population standard deviation.
///
/// Same shape as [`sma`]: full length, first `period - 1` entries
/// undefined. Each window is measured around its own mean.
pub fn std_dev(prices: &[f64], period: usize) -> Result<Vec<f64>, IndicatorError> {
    check_period("period", period)?;

    let mut result = vec![UNDEFINED; prices.len()];
    if prices.len() < period {
        return Ok(result);
    }

    for (i, window) in prices.windows(period).enumerate() {
        result[i + period - 1] = simd::population_std_dev(window);
    }

    Ok(result)
}

/// Bollinger Bands output.
///
/// Six aligned sequences sharing the SMA's undefined prefix.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BollingerOutput {
    /// Middle + multiplier·σ
    pub upper_outer: Vec<f64>,
    /// Middle + (multiplier/2)·σ
    pub upper_inner: Vec<f64>,
    /// SMA
    pub middle: Vec<f64>,
    /// Middle - (multiplier/2)·σ
    pub lower_inner: Vec<f64>,
    /// Middle - multiplier·σ
    pub lower_outer: Vec<f64>,
    /// Population σ of each window
    pub std_dev: Vec<f64>,
}

impl BollingerOutput {
    pub fn len(&self) -> usize {
        self.middle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middle.is_empty()
    }
}

/// Bollinger Bands.
///
/// With the default multiplier of 2 the outer bands sit at ±2σ and the
/// inner bands at ±1σ around the SMA.
pub fn bollinger_bands(
    prices: &[f64],
    period: usize,
    multiplier: f64,
) -> Result<BollingerOutput, IndicatorError> {
    check_period("period", period)?;
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(IndicatorError::InvalidParameter(format!(
            "multiplier must be a positive number, got {multiplier}"
        )));
    }

    let middle = sma(prices, period)?;
    let sigma = std_dev(prices, period)?;
    let inner = multiplier / 2.0;

    let band = |k: f64| -> Vec<f64> {
        middle
            .iter()
            .zip(&sigma)
            .map(|(m, s)| m + k * s)
            .collect()
    };

    Ok(BollingerOutput {
        upper_outer: band(multiplier),
        upper_inner: band(inner),
        lower_inner: band(-inner),
        lower_outer: band(-multiplier),
        middle,
        std_dev: sigma,
    })
}
