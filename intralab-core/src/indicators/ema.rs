//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2/(period+1).
//! Seed: EMA[0] = close[0], so the series is defined from the first bar. This
//! keeps EMA20/EMA50 usable early in a session, which the regime classifier
//! relies on.
//! Lookback: 0.

use super::{closes, ewm, Indicator};
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        ema_of_series(&closes(candles), self.period)
    }
}

/// EMA of an arbitrary series (used by MACD for its signal line).
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; values.len()];
    }
    ewm(values, 2.0 / (period as f64 + 1.0), 1)
}
