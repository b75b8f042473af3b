//! Stochastic oscillator (14, 3, 3).
//!
//! raw %K = 100 * (close - LL(k)) / (HH(k) - LL(k)); %K = SMA(raw, smooth_k);
//! %D = SMA(%K, d). A flat window (HH == LL) gives 50.

use super::{rolling_mean, Indicator};
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StochasticLine {
    K,
    D,
}

#[derive(Debug, Clone)]
pub struct Stochastic {
    k: usize,
    smooth_k: usize,
    d: usize,
    line: StochasticLine,
    name: String,
}

impl Stochastic {
    pub fn new(k: usize, smooth_k: usize, d: usize, line: StochasticLine) -> Self {
        assert!(k >= 1 && smooth_k >= 1 && d >= 1, "stochastic windows must be >= 1");
        let name = match line {
            StochasticLine::K => "stoch_k".to_string(),
            StochasticLine::D => "stoch_d".to_string(),
        };
        Self {
            k,
            smooth_k,
            d,
            line,
            name,
        }
    }
}

impl Indicator for Stochastic {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        let k_lb = self.k - 1 + self.smooth_k - 1;
        match self.line {
            StochasticLine::K => k_lb,
            StochasticLine::D => k_lb + self.d - 1,
        }
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut raw = vec![f64::NAN; n];
        for i in self.k.saturating_sub(1)..n {
            let window = &candles[i + 1 - self.k..=i];
            let hh = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
            let ll = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            raw[i] = if hh > ll {
                100.0 * (candles[i].close - ll) / (hh - ll)
            } else {
                50.0
            };
        }
        let k = rolling_mean(&raw, self.smooth_k);
        match self.line {
            StochasticLine::K => k,
            StochasticLine::D => rolling_mean(&k, self.d),
        }
    }
}
