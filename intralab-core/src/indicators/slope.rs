//! Least-squares slopes over the trailing three observations.

/// Points used by the slope estimate.
pub const SLOPE_POINTS: usize = 3;

/// Linear-regression slope (units per bar) of the last three finite values.
/// Zero when fewer than three are available.
pub fn linreg_slope(values: &[f64]) -> f64 {
    let tail: Vec<f64> = values
        .iter()
        .rev()
        .filter(|v| v.is_finite())
        .take(SLOPE_POINTS)
        .copied()
        .collect();
    if tail.len() < SLOPE_POINTS {
        return 0.0;
    }
    let ys: Vec<f64> = tail.into_iter().rev().collect();
    let n = ys.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    num / den
}

/// Slope at every bar, using only values up to that bar.
pub fn slope_series(values: &[f64]) -> Vec<f64> {
    (0..values.len())
        .map(|i| linreg_slope(&values[..=i]))
        .collect()
}
