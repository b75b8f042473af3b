//! Retest-and-hold acceptance around a level.
//!
//! Long: over the last `bars` bars the low never undercut the level by more
//! than `retest_bpct`, and the last close holds at or above the level (and
//! VWAP when required). Short is the mirror image. The screener and the
//! planner both call [`evaluate`]; only their level and window differ.

use serde::{Deserialize, Serialize};

use crate::domain::{Candle, Side};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acceptance {
    pub retest_ok: bool,
    pub hold_ok: bool,
}

impl Acceptance {
    pub fn ok(&self) -> bool {
        self.retest_ok && self.hold_ok
    }
}

pub fn evaluate(
    candles: &[Candle],
    vwap: Option<f64>,
    level: f64,
    side: Side,
    bars: usize,
    retest_bpct: f64,
    need_vwap_hold: bool,
) -> Acceptance {
    let Some(last) = candles.last() else {
        return Acceptance::default();
    };
    if !level.is_finite() {
        return Acceptance::default();
    }
    let start = candles.len().saturating_sub(bars.max(1));
    let window = &candles[start..];
    let close = last.close;

    match side {
        Side::Long => {
            let min_low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let vwap_ok = !need_vwap_hold || vwap.is_some_and(|v| close >= v);
            Acceptance {
                retest_ok: min_low >= level * (1.0 - retest_bpct / 100.0),
                hold_ok: close >= level && vwap_ok,
            }
        }
        Side::Short => {
            let max_high = window
                .iter()
                .map(|c| c.high)
                .fold(f64::NEG_INFINITY, f64::max);
            let vwap_ok = !need_vwap_hold || vwap.is_some_and(|v| close <= v);
            Acceptance {
                retest_ok: max_high <= level * (1.0 + retest_bpct / 100.0),
                hold_ok: close <= level && vwap_ok,
            }
        }
    }
}
