//! Bollinger Bands (20, 2) exposed as %B and bandwidth.
//!
//! middle = SMA(close), upper/lower = middle ± k * sample std.
//! %B = (close - lower) / (upper - lower); bandwidth = (upper - lower) / middle.
//! Lookback: period - 1. Zero-width bands give NaN %B.

use super::{closes, rolling_mean, rolling_std, Indicator};
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerLine {
    PercentB,
    Bandwidth,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    k: f64,
    line: BollingerLine,
    name: String,
}

impl Bollinger {
    pub fn new(period: usize, k: f64, line: BollingerLine) -> Self {
        assert!(period >= 2, "Bollinger period must be >= 2");
        let name = match line {
            BollingerLine::PercentB => "bb_pctb".to_string(),
            BollingerLine::Bandwidth => "bb_width".to_string(),
        };
        Self {
            period,
            k,
            line,
            name,
        }
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let c = closes(candles);
        let mid = rolling_mean(&c, self.period);
        let std = rolling_std(&c, self.period);
        (0..c.len())
            .map(|i| {
                let upper = mid[i] + self.k * std[i];
                let lower = mid[i] - self.k * std[i];
                let width = upper - lower;
                match self.line {
                    BollingerLine::PercentB if width > 0.0 => (c[i] - lower) / width,
                    BollingerLine::PercentB => f64::NAN,
                    BollingerLine::Bandwidth if mid[i] != 0.0 => width / mid[i],
                    BollingerLine::Bandwidth => f64::NAN,
                }
            })
            .collect()
    }
}

/// Percentile rank (0–100) of the last finite value within the series.
///
/// Counts values ≤ the last one, pandas `rank(pct=True)` style. `None` when
/// the last value is missing.
pub fn percentile_rank_last(values: &[f64]) -> Option<f64> {
    let last = *values.last()?;
    if !last.is_finite() {
        return None;
    }
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let at_or_below = finite.iter().filter(|&&v| v <= last).count();
    Some(100.0 * at_or_below as f64 / finite.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles};

    #[test]
    fn percent_b_at_mean_is_half() {
        // 1, 3, 2: mean 2, close 2
        let candles = make_candles(&[1.0, 3.0, 2.0]);
        let out = Bollinger::new(3, 2.0, BollingerLine::PercentB).compute(&candles);
        assert!(out[1].is_nan());
        assert_approx(out[2], 0.5, 1e-9);
    }

    #[test]
    fn flat_series_has_missing_percent_b() {
        let candles = make_candles(&[10.0; 5]);
        let out = Bollinger::new(3, 2.0, BollingerLine::PercentB).compute(&candles);
        assert!(out[4].is_nan());
        let width = Bollinger::new(3, 2.0, BollingerLine::Bandwidth).compute(&candles);
        assert_approx(width[4], 0.0, 1e-12);
    }

    #[test]
    fn percentile_rank_of_last() {
        assert_eq!(percentile_rank_last(&[f64::NAN, 1.0, 2.0, 3.0, 0.5]), Some(25.0));
        assert_eq!(percentile_rank_last(&[1.0, 2.0, 3.0, 4.0]), Some(100.0));
        assert_eq!(percentile_rank_last(&[1.0, f64::NAN]), None);
        assert_eq!(percentile_rank_last(&[]), None);
    }
}
