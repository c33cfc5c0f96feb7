//! SIMD window kernels.
//!
//! These use the `wide` crate for portable SIMD. Results are
//! deterministic for a given input: lanes are always reduced in the same
//! order, so repeated calls produce bit-identical output.

use wide::f64x4;

/// Sum of a slice.
pub fn sum(data: &[f64]) -> f64 {
    let chunks = data.len() / 4;
    let mut acc = f64x4::splat(0.0);

    for i in 0..chunks {
        let idx = i * 4;
        acc += f64x4::new([data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]);
    }

    let mut result = acc.reduce_add();
    for &value in &data[chunks * 4..] {
        result += value;
    }
    result
}

/// Sum of squared deviations from `mean`.
pub fn sum_squared_deviations(data: &[f64], mean: f64) -> f64 {
    let chunks = data.len() / 4;
    let mean_vec = f64x4::splat(mean);
    let mut acc = f64x4::splat(0.0);

    for i in 0..chunks {
        let idx = i * 4;
        let diff = f64x4::new([data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]) - mean_vec;
        acc += diff * diff;
    }

    let mut result = acc.reduce_add();
    for &value in &data[chunks * 4..] {
        let diff = value - mean;
        result += diff * diff;
    }
    result
}

/// Arithmetic mean of a non-empty window.
#[inline]
pub fn mean(window: &[f64]) -> f64 {
    sum(window) / window.len() as f64
}

/// Population standard deviation of a non-empty window, around the
/// window's own mean.
pub fn population_std_dev(window: &[f64]) -> f64 {
    let m = mean(window);
    (sum_squared_deviations(window, m) / window.len() as f64).sqrt()
}
