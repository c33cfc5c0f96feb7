use quotefeed_core::{CandleSeries, IndicatorError, IndicatorResult, IndicatorSeries, IndicatorSpec};

use crate::{bollinger_bands, ema, macd, rsi, sma, UNDEFINED};

/// Run the indicator described by `spec` over the closes of `candles`.
///
/// Every output series is left-padded with undefined values so it lines
/// up index-for-index with the candle timestamps.
pub fn compute(spec: &IndicatorSpec, candles: &CandleSeries) -> Result<IndicatorResult, IndicatorError> {
    spec.validate()?;

    let closes = candles.closes();
    let len = closes.len();

    let series = match *spec {
        IndicatorSpec::Sma { period } => vec![IndicatorSeries::new("sma", sma(&closes, period)?)],
        IndicatorSpec::Ema { period } => vec![IndicatorSeries::new("ema", ema(&closes, period)?)],
        IndicatorSpec::Rsi { period } => {
            vec![IndicatorSeries::new("rsi", pad_front(rsi(&closes, period)?, len))]
        }
        IndicatorSpec::Macd { fast, slow, signal } => {
            let out = macd(&closes, fast, slow, signal)?;
            vec![
                IndicatorSeries::new("macd", pad_front(out.macd, len)),
                IndicatorSeries::new("signal", pad_front(out.signal, len)),
                IndicatorSeries::new("histogram", pad_front(out.histogram, len)),
            ]
        }
        IndicatorSpec::Bollinger { period, multiplier } => {
            let out = bollinger_bands(&closes, period, multiplier)?;
            vec![
                IndicatorSeries::new("upper2", out.upper_outer),
                IndicatorSeries::new("upper1", out.upper_inner),
                IndicatorSeries::new("middle", out.middle),
                IndicatorSeries::new("lower1", out.lower_inner),
                IndicatorSeries::new("lower2", out.lower_outer),
                IndicatorSeries::new("stdDev", out.std_dev),
            ]
        }
    };

    Ok(IndicatorResult {
        symbol: candles.symbol.clone(),
        kind: spec.kind(),
        parameters: spec.parameters(),
        timestamps: candles.timestamps(),
        series,
    })
}

fn pad_front(values: Vec<f64>, len: usize) -> Vec<f64> {
    if values.len() >= len {
        return values;
    }
    let mut padded = vec![UNDEFINED; len - values.len()];
    padded.extend(values);
    padded
}
