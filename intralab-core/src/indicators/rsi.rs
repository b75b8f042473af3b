//! Relative Strength Index (RSI).
//!
//! Wilder smoothing via EWM(alpha = 1/period) of gains and losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period (first valid value at index `period`).
//! Edge cases: avg_loss == 0 → RSI = 100; both zero → 50.

use super::{ewm, Indicator};
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut gains = vec![f64::NAN; n];
        let mut losses = vec![f64::NAN; n];
        for i in 1..n {
            let change = candles[i].close - candles[i - 1].close;
            if change.is_nan() {
                continue;
            }
            gains[i] = change.max(0.0);
            losses[i] = (-change).max(0.0);
        }

        let alpha = 1.0 / self.period as f64;
        let avg_gain = ewm(&gains, alpha, self.period);
        let avg_loss = ewm(&losses, alpha, self.period);

        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&g, &l)| {
                if g.is_nan() || l.is_nan() {
                    f64::NAN
                } else {
                    compute_rsi(g, l)
                }
            })
            .collect()
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
