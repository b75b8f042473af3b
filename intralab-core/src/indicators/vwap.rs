//! Session VWAP: cumsum(typical_price * volume) / cumsum(volume).
//!
//! Accumulators reset whenever the IST session date changes. Missing while
//! the session's cumulative volume is zero.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone, Default)]
pub struct Vwap;

impl Vwap {
    pub fn new() -> Self {
        Self
    }
}

impl Indicator for Vwap {
    fn name(&self) -> &str {
        "vwap"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let mut out = Vec::with_capacity(candles.len());
        let mut day = None;
        let mut cum_pv = 0.0;
        let mut cum_v = 0.0;
        for c in candles {
            let d = c.session_date();
            if day != Some(d) {
                day = Some(d);
                cum_pv = 0.0;
                cum_v = 0.0;
            }
            let v = c.volume as f64;
            cum_pv += c.typical_price() * v;
            cum_v += v;
            out.push(if cum_v > 0.0 { cum_pv / cum_v } else { f64::NAN });
        }
        out
    }
}
