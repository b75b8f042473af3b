//! On-Balance Volume: running sum of volume signed by the close-to-close move.
//! OBV[0] = 0.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone, Default)]
pub struct Obv;

impl Obv {
    pub fn new() -> Self {
        Self
    }
}

impl Indicator for Obv {
    fn name(&self) -> &str {
        "obv"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let mut out = Vec::with_capacity(candles.len());
        let mut acc = 0.0;
        for (i, c) in candles.iter().enumerate() {
            if i > 0 {
                let prev = candles[i - 1].close;
                if c.close > prev {
                    acc += c.volume as f64;
                } else if c.close < prev {
                    acc -= c.volume as f64;
                }
            }
            out.push(acc);
        }
        out
    }
}
