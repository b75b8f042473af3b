//! Choppiness Index.
//!
//! CHOP = 100 * log10(ΣTR / (max(high) - min(low))) / log10(n) over the
//! trailing `n` bars. NaN until `n` bars exist or when the window has no
//! true range.

use super::atr::true_range;
use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Choppiness {
    lookback: usize,
    name: String,
}

impl Choppiness {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback >= 2, "choppiness lookback must be >= 2");
        Self {
            lookback,
            name: format!("chop_{lookback}"),
        }
    }
}

impl Indicator for Choppiness {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.lookback - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let tr = true_range(candles);
        let mut out = vec![f64::NAN; n];
        let denom = (self.lookback as f64).log10();
        for i in (self.lookback - 1)..n {
            let start = i + 1 - self.lookback;
            let sum_tr: f64 = tr[start..=i].iter().sum();
            if !(sum_tr > 0.0) {
                continue;
            }
            let window = &candles[start..=i];
            let hh = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
            let ll = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let span = (hh - ll).max(1e-9);
            out[i] = 100.0 * (sum_tr / span).log10() / denom;
        }
        out
    }
}
