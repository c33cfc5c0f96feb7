//! Momentum indicators.

use quotefeed_core::{check_period, IndicatorError};
use serde::Serialize;

use crate::moving_average::ema;
use crate::UNDEFINED;

/// Relative Strength Index (RSI) with Wilder smoothing.
///
/// Returns `prices.len() - period` values; entry `j` corresponds to price
/// index `j + period`. Fewer than `period + 1` prices yields an empty
/// output. A window with no losses reports 100.
pub fn rsi(prices: &[f64], period: usize) -> Result<Vec<f64>, IndicatorError> {
    check_period("period", period)?;

    if prices.len() <= period {
        return Ok(vec![]);
    }

    let period_f64 = period as f64;
    let mut result = Vec::with_capacity(prices.len() - period);

    // Initial averages over the first `period` changes
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for pair in prices[..=period].windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= period_f64;
    avg_loss /= period_f64;
    result.push(rsi_value(avg_gain, avg_loss));

    // Wilder's smoothing: avg = (prev_avg * (period-1) + value) / period
    for pair in prices[period..].windows(2) {
        let change = pair[1] - pair[0];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (period_f64 - 1.0) + gain) / period_f64;
        avg_loss = (avg_loss * (period_f64 - 1.0) + loss) / period_f64;
        result.push(rsi_value(avg_gain, avg_loss));
    }

    Ok(result)
}

#[inline]
fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// MACD output: three equal-length sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MacdOutput {
    /// Fast EMA minus slow EMA
    pub macd: Vec<f64>,
    /// EMA of the MACD line; undefined until `signal` MACD values exist
    pub signal: Vec<f64>,
    /// MACD minus signal
    pub histogram: Vec<f64>,
}

impl MacdOutput {
    pub fn len(&self) -> usize {
        self.macd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macd.is_empty()
    }
}

/// Moving Average Convergence Divergence.
///
/// The MACD line starts at price index `slow - 1`, so every sequence has
/// `prices.len() - slow + 1` entries (empty when fewer than `slow`
/// prices). The signal line is an EMA of the MACD line with its first
/// `signal - 1` entries marked undefined.
pub fn macd(
    prices: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<MacdOutput, IndicatorError> {
    check_period("fast", fast)?;
    check_period("slow", slow)?;
    check_period("signal", signal)?;
    if fast >= slow {
        return Err(IndicatorError::InvalidParameter(format!(
            "fast period ({fast}) must be less than slow period ({slow})"
        )));
    }

    if prices.len() < slow {
        return Ok(MacdOutput::default());
    }

    let fast_ema = ema(prices, fast)?;
    let slow_ema = ema(prices, slow)?;

    let macd_line: Vec<f64> = fast_ema[slow - 1..]
        .iter()
        .zip(&slow_ema[slow - 1..])
        .map(|(f, s)| f - s)
        .collect();

    let mut signal_line = ema(&macd_line, signal)?;
    for value in signal_line.iter_mut().take(signal - 1) {
        *value = UNDEFINED;
    }

    let histogram = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    Ok(MacdOutput {
        macd: macd_line,
        signal: signal_line,
        histogram,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_bounds() {
        let data: Vec<f64> = (0..100)
            .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0)
            .collect();
        let result = rsi(&data, 14).unwrap();

        assert_eq!(result.len(), 86);
        for &value in &result {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let data: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        let result = rsi(&data, 14).unwrap();
        assert!(result.iter().all(|&v| v == 100.0));
    }

    #[test]
    fn test_rsi_all_losses_is_0() {
        let data: Vec<f64> = (1..=30).rev().map(|i| i as f64).collect();
        let result = rsi(&data, 14).unwrap();
        assert!(result.iter().all(|&v| v.abs() < 1e-10));
    }

    #[test]
    fn test_rsi_flat_prices() {
        let result = rsi(&[5.0; 20], 14).unwrap();
        assert_eq!(result.len(), 6);
        assert!(result.iter().all(|&v| v == 100.0));
    }

    #[test]
    fn test_rsi_insufficient_data() {
        assert!(rsi(&[1.0; 14], 14).unwrap().is_empty());
        assert_eq!(rsi(&[1.0; 15], 14).unwrap().len(), 1);
    }

    #[test]
    fn test_rsi_known_value() {
        // changes: +1, -1, +2  -> avg gain 1.0, avg loss 1/3 with period 3
        let result = rsi(&[10.0, 11.0, 10.0, 12.0], 3).unwrap();
        assert_eq!(result.len(), 1);
        assert!((result[0] - 75.0).abs() < 1e-10);
    }

    #[test]
    fn test_macd_shape() {
        let data: Vec<f64> = (0..100)
            .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0)
            .collect();
        let result = macd(&data, 12, 26, 9).unwrap();

        assert_eq!(result.len(), 75);
        assert_eq!(result.signal.len(), 75);
        assert_eq!(result.histogram.len(), 75);
        assert!(result.signal[..8].iter().all(|v| v.is_nan()));
        assert!(result.signal[8..].iter().all(|v| !v.is_nan()));

        for i in 8..result.len() {
            let expected = result.macd[i] - result.signal[i];
            assert!((result.histogram[i] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_macd_line_is_ema_difference() {
        let data: Vec<f64> = (0..40).map(|i| 50.0 + i as f64 * 0.5).collect();
        let out = macd(&data, 3, 6, 2).unwrap();
        let fast = ema(&data, 3).unwrap();
        let slow = ema(&data, 6).unwrap();

        assert_eq!(out.len(), 35);
        for (j, value) in out.macd.iter().enumerate() {
            assert!((value - (fast[j + 5] - slow[j + 5])).abs() < 1e-12);
        }
    }

    #[test]
    fn test_macd_insufficient_data() {
        let out = macd(&[1.0; 25], 12, 26, 9).unwrap();
        assert!(out.is_empty());
        assert_eq!(macd(&[1.0; 26], 12, 26, 9).unwrap().len(), 1);
    }

    #[test]
    fn test_macd_rejects_inverted_periods() {
        assert!(matches!(
            macd(&[1.0; 50], 26, 12, 9),
            Err(IndicatorError::InvalidParameter(_))
        ));
        assert!(matches!(
            macd(&[1.0; 50], 12, 12, 9),
            Err(IndicatorError::InvalidParameter(_))
        ));
    }
}
