//! Indicator kernel.
//!
//! Every indicator is a pure transform over an ordered candle slice that
//! returns a series of the same length. Missing values are `f64::NAN`; an
//! indicator never panics on short input, it just returns NaN where it has
//! insufficient history. The session snapshot records which indicators came
//! back missing on the last bar.
//!
//! Multi-series indicators (ADX, MACD, Bollinger, Stochastic) are exposed as
//! separate named instances per line, keeping the single-series `Indicator`
//! trait unchanged.
//!
//! Smoothing follows the conventions the backtests were tuned against:
//! EMAs are recursive and seeded with the first value, RSI/ADX use Wilder
//! EWM (alpha = 1/period), ATR is a plain rolling mean of true range.

use std::collections::HashMap;

use crate::domain::Candle;

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod choppiness;
pub mod ema;
pub mod fibonacci;
pub mod macd;
pub mod obv;
pub mod patterns;
pub mod rsi;
pub mod slope;
pub mod stochastic;
pub mod volume;
pub mod vwap;

pub use adx::{Adx, AdxLine};
pub use atr::{Atr, RangeAtr};
pub use bollinger::{Bollinger, BollingerLine};
pub use choppiness::Choppiness;
pub use ema::Ema;
pub use fibonacci::{FibLevels, FIB_RATIOS};
pub use macd::{Macd, MacdLine};
pub use obv::Obv;
pub use patterns::CandlePattern;
pub use rsi::Rsi;
pub use slope::{linreg_slope, slope_series};
pub use stochastic::{Stochastic, StochasticLine};
pub use volume::VolumeRatio;
pub use vwap::Vwap;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on data from bar t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Column name (e.g., "rsi_14", "vwap").
    fn name(&self) -> &str;

    /// Number of leading bars that are NaN by construction.
    fn lookback(&self) -> usize;

    /// Compute the indicator over the whole slice.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Named indicator columns for one candle slice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorValues {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Value at `index`, `None` when absent or NaN.
    pub fn get(&self, name: &str, index: usize) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.get(index).copied())
            .filter(|v| v.is_finite())
    }

    /// Last value of a column, `None` when absent or NaN.
    pub fn last(&self, name: &str) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.last().copied())
            .filter(|v| v.is_finite())
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

// ─── Shared numeric helpers ──────────────────────────────────────────

/// Recursive exponential smoothing, seeded with the first finite value.
///
/// `y[t] = alpha * x[t] + (1 - alpha) * y[t-1]`. NaN inputs before the seed
/// are skipped; a NaN after the seed carries the previous value forward.
/// Output is NaN until `min_periods` finite inputs have been seen.
pub fn ewm(values: &[f64], alpha: f64, min_periods: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let mut state: Option<f64> = None;
    let mut seen = 0usize;
    for (i, &x) in values.iter().enumerate() {
        if x.is_finite() {
            seen += 1;
            state = Some(match state {
                None => x,
                Some(prev) => alpha * x + (1.0 - alpha) * prev,
            });
        }
        if seen >= min_periods.max(1) {
            if let Some(s) = state {
                out[i] = s;
            }
        }
    }
    out
}

/// Rolling mean over `window` values; NaN until the window is full or when
/// the window contains a NaN.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().all(|v| v.is_finite()) {
            out[i] = slice.iter().sum::<f64>() / window as f64;
        }
    }
    out
}

/// Rolling sample standard deviation (ddof = 1).
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window < 2 {
        return out;
    }
    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| !v.is_finite()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
        out[i] = var.sqrt();
    }
    out
}

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Create synthetic 5-minute candles from close prices for testing.
///
/// open = prev_close (or close for the first bar),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0, volume = 1000.
/// Timestamps start at 09:15 IST on 2024-03-04.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    use crate::domain::ist_datetime;
    let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    let open_time = chrono::NaiveTime::from_hms_opt(9, 15, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                timestamp: ist_datetime(date, open_time + chrono::Duration::minutes(5 * i as i64)),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ewm_seeds_with_first_value() {
        let out = ewm(&[10.0, 20.0, 30.0], 0.5, 1);
        assert_approx(out[0], 10.0, DEFAULT_EPSILON);
        assert_approx(out[1], 15.0, DEFAULT_EPSILON);
        assert_approx(out[2], 22.5, DEFAULT_EPSILON);
    }

    #[test]
    fn ewm_respects_min_periods() {
        let out = ewm(&[f64::NAN, 1.0, 2.0, 3.0], 0.5, 2);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_approx(out[2], 1.5, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_mean_window() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_approx(out[2], 2.0, DEFAULT_EPSILON);
        assert_approx(out[3], 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_std_is_sample() {
        let out = rolling_std(&[2.0, 4.0, 6.0], 3);
        assert_approx(out[2], 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn values_hide_nan() {
        let mut iv = IndicatorValues::new();
        iv.insert("x", vec![1.0, f64::NAN]);
        assert_eq!(iv.get("x", 0), Some(1.0));
        assert_eq!(iv.last("x"), None);
        assert_eq!(iv.last("missing"), None);
    }
}
