//! Average True Range (ATR) and the range-based ATR proxy.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), TR[0] = high-low.
//! `Atr` is a plain rolling mean of TR over `period` (not Wilder smoothing).
//! `RangeAtr` ("atr5") is the rolling mean of high-low over the last `period`
//! bars, falling back to the mean of whatever bars exist.

use super::{rolling_mean, Indicator};
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// Compute the True Range series.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(candles.len());
    for (i, c) in candles.iter().enumerate() {
        let hl = c.high - c.low;
        let value = match i.checked_sub(1).map(|p| candles[p].close) {
            Some(pc) if pc.is_finite() => hl.max((c.high - pc).abs()).max((c.low - pc).abs()),
            _ => hl,
        };
        tr.push(value);
    }
    tr
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        rolling_mean(&true_range(candles), self.period)
    }
}

#[derive(Debug, Clone)]
pub struct RangeAtr {
    period: usize,
    name: String,
}

impl RangeAtr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "range ATR period must be >= 1");
        Self {
            period,
            name: format!("atr{period}"),
        }
    }
}

impl Indicator for RangeAtr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let ranges: Vec<f64> = candles.iter().map(|c| c.range()).collect();
        (0..ranges.len())
            .map(|i| {
                let start = (i + 1).saturating_sub(self.period);
                let window = &ranges[start..=i];
                window.iter().sum::<f64>() / window.len() as f64
            })
            .collect()
    }
}
