//! Volume ratio: volume / rolling mean of volume over `window` bars.
//!
//! The mean uses whatever bars exist (min_periods = 1), so the ratio is
//! defined from the first bar. Zero average volume gives NaN.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct VolumeRatio {
    window: usize,
}

impl VolumeRatio {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "volume window must be >= 1");
        Self { window }
    }
}

impl Indicator for VolumeRatio {
    fn name(&self) -> &str {
        "volume_ratio"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        (0..candles.len())
            .map(|i| {
                let start = (i + 1).saturating_sub(self.window);
                let window = &candles[start..=i];
                let avg = window.iter().map(|c| c.volume as f64).sum::<f64>() / window.len() as f64;
                if avg > 0.0 {
                    candles[i].volume as f64 / avg
                } else {
                    f64::NAN
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, DEFAULT_EPSILON};

    #[test]
    fn ratio_against_running_average() {
        let mut candles = make_candles(&[100.0, 100.0, 100.0]);
        candles[2].volume = 4000;
        let out = VolumeRatio::new(20).compute(&candles);
        assert_approx(out[0], 1.0, DEFAULT_EPSILON);
        // avg = 6000 / 3
        assert_approx(out[2], 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn zero_volume_is_missing() {
        let mut candles = make_candles(&[100.0]);
        candles[0].volume = 0;
        assert!(VolumeRatio::new(20).compute(&candles)[0].is_nan());
    }
}
