//! Fibonacci retracement levels over the trailing closes.

use serde::{Deserialize, Serialize};

use crate::domain::Candle;

pub const FIB_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

/// Closes considered by default.
pub const FIB_WINDOW: usize = 30;

/// Retracement prices measured down from the window high: ratio 0 is the
/// high, ratio 1 the low.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibLevels {
    pub high: f64,
    pub low: f64,
    pub levels: Vec<(f64, f64)>,
}

impl FibLevels {
    /// Levels over the last `window` closes; `None` with fewer than two.
    pub fn from_candles(candles: &[Candle], window: usize) -> Option<Self> {
        let start = candles.len().saturating_sub(window);
        let closes: Vec<f64> = candles[start..]
            .iter()
            .map(|c| c.close)
            .filter(|v| v.is_finite())
            .collect();
        if closes.len() < 2 {
            return None;
        }
        let high = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let low = closes.iter().copied().fold(f64::INFINITY, f64::min);
        let diff = high - low;
        let levels = FIB_RATIOS
            .iter()
            .map(|&r| (r, round2(high - r * diff)))
            .collect();
        Some(Self { high, low, levels })
    }

    /// Ratio of the level closest to `price`.
    pub fn nearest_ratio(&self, price: f64) -> Option<f64> {
        self.levels
            .iter()
            .min_by(|a, b| (a.1 - price).abs().total_cmp(&(b.1 - price).abs()))
            .map(|&(r, _)| r)
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
