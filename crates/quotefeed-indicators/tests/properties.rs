//! Property tests for the indicator functions.

use proptest::prelude::*;
use quotefeed_indicators::{bollinger_bands, ema, macd, rsi, sma, std_dev};
use statrs::statistics::Statistics;

fn prices() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..1_000.0, 0..200)
}

proptest! {
    #[test]
    fn sma_has_input_length_and_undefined_prefix(data in prices(), period in 1usize..50) {
        let out = sma(&data, period).unwrap();
        prop_assert_eq!(out.len(), data.len());

        for (i, value) in out.iter().enumerate() {
            if i + 1 < period {
                prop_assert!(value.is_nan());
            } else {
                let window = &data[i + 1 - period..=i];
                let expected = window.iter().sum::<f64>() / period as f64;
                prop_assert!((value - expected).abs() < 1e-9 * expected.abs().max(1.0));
            }
        }
    }

    #[test]
    fn std_dev_matches_reference(data in prop::collection::vec(1.0f64..1_000.0, 2..120), period in 2usize..30) {
        let out = std_dev(&data, period).unwrap();
        for i in (period - 1)..data.len() {
            let window = &data[i + 1 - period..=i];
            let expected = window.iter().population_std_dev();
            prop_assert!((out[i] - expected).abs() < 1e-7);
        }
    }

    #[test]
    fn rsi_is_bounded(data in prices(), period in 1usize..30) {
        let out = rsi(&data, period).unwrap();
        prop_assert_eq!(out.len(), data.len().saturating_sub(period));
        for value in out {
            prop_assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn macd_histogram_is_difference(data in prices(), fast in 1usize..15, extra in 1usize..20, signal in 1usize..12) {
        let slow = fast + extra;
        let out = macd(&data, fast, slow, signal).unwrap();

        let expected_len = (data.len() + 1).saturating_sub(slow);
        prop_assert_eq!(out.macd.len(), expected_len);
        prop_assert_eq!(out.signal.len(), expected_len);
        prop_assert_eq!(out.histogram.len(), expected_len);

        for i in 0..expected_len {
            if out.signal[i].is_nan() {
                prop_assert!(i + 1 < signal);
            } else {
                prop_assert!((out.histogram[i] - (out.macd[i] - out.signal[i])).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn bollinger_outer_width_is_four_sigma(data in prices(), period in 1usize..40) {
        let bands = bollinger_bands(&data, period, 2.0).unwrap();
        let middle = sma(&data, period).unwrap();
        prop_assert_eq!(bands.len(), middle.len());

        for i in 0..bands.len() {
            prop_assert_eq!(bands.upper_outer[i].is_nan(), middle[i].is_nan());
            if !middle[i].is_nan() {
                let width = bands.upper_outer[i] - bands.lower_outer[i];
                prop_assert!((width - 4.0 * bands.std_dev[i]).abs() < 1e-7);
            }
        }
    }

    #[test]
    fn ema_is_bit_reproducible(data in prices(), period in 1usize..50) {
        let a = ema(&data, period).unwrap();
        let b = ema(&data, period).unwrap();
        prop_assert_eq!(a.len(), data.len());
        prop_assert!(a.iter().zip(&b).all(|(x, y)| x.to_bits() == y.to_bits()));
    }
}

#[test]
fn sma_reference_values() {
    let prices: Vec<f64> = (10..=20).map(|p| p as f64).collect();
    let out = sma(&prices, 5).unwrap();

    let defined: Vec<f64> = out.iter().copied().filter(|v| !v.is_nan()).collect();
    assert_eq!(out.iter().filter(|v| v.is_nan()).count(), 4);
    assert_eq!(defined, vec![12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0]);
}
