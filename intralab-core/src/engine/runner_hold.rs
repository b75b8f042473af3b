//! Runner-hold decision after a T1 partial.
//!
//! The runner is kept only when the estimated probability of reaching T2
//! beats the break-even probability `L / (G + L)`, with `G` the extra reward
//! from T1 to T2 and `L` the give-back from T1 to the stop.

use chrono::NaiveTime;

use crate::domain::{Side, TradeMeta};

const LATE_SESSION: (u32, u32) = (14, 30);

/// Baseline probability of T2 adjusted by entry-time feature bumps, in `[0, 1]`.
pub fn p2(meta: &TradeMeta, bar_time: NaiveTime, baseline: f64) -> f64 {
    let mut p = baseline;
    if meta.adx.is_some_and(|a| a >= 25.0) && meta.adx_slope > 0.0 {
        p += 0.08;
    }
    if meta.rsi.is_some_and(|r| (55.0..=68.0).contains(&r)) && meta.rsi_slope > 0.0 {
        p += 0.06;
    }
    if meta.volume_ratio >= 2.0 {
        p += 0.06;
    }
    if meta.squeeze_pctile.is_some_and(|s| s <= 60.0) {
        p += 0.05;
    }
    let late = NaiveTime::from_hms_opt(LATE_SESSION.0, LATE_SESSION.1, 0).unwrap_or(NaiveTime::MIN);
    if bar_time >= late {
        p -= 0.10;
    }
    p.clamp(0.0, 1.0)
}

/// `L / (G + L)`, or `None` when both legs are zero.
pub fn breakeven_probability(side: Side, stop: f64, t1: f64, t2: f64) -> Option<f64> {
    let gain = (t2 - t1).abs();
    let loss = match side {
        Side::Long => (t1 - stop).max(0.0),
        Side::Short => (stop - t1).max(0.0),
    };
    let denom = gain + loss;
    (denom > 0.0).then(|| loss / denom)
}

pub fn keep_runner(p2: f64, side: Side, stop: f64, t1: f64, t2: f64) -> bool {
    breakeven_probability(side, stop, t1, t2).is_some_and(|threshold| p2 > threshold)
}
