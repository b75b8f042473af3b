//! Strategy selection: first matching setup wins.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::regime::Regime;
use crate::domain::{Candle, Side};
use crate::levels::{swing_high, swing_low, SessionLevels};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    OrbPullbackLong,
    VwapReclaimLong,
    PdhBreakHoldLong,
    PdlBreakHoldShort,
    RangeBreakRetestShort,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::OrbPullbackLong => "orb_pullback_long",
            Strategy::VwapReclaimLong => "vwap_reclaim_long",
            Strategy::PdhBreakHoldLong => "pdh_break_hold_long",
            Strategy::PdlBreakHoldShort => "pdl_break_hold_short",
            Strategy::RangeBreakRetestShort => "range_break_retest_short",
        }
    }

    pub fn bias(&self) -> Side {
        match self {
            Strategy::OrbPullbackLong | Strategy::VwapReclaimLong | Strategy::PdhBreakHoldLong => {
                Side::Long
            }
            Strategy::PdlBreakHoldShort | Strategy::RangeBreakRetestShort => Side::Short,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chosen strategy with its structural stop (`None` when no pivot exists).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyPick {
    pub strategy: Strategy,
    pub structure_stop: Option<f64>,
}

/// Inputs to strategy selection, all taken from the last bar of the session.
pub struct SetupContext<'a> {
    pub candles: &'a [Candle],
    pub regime: Regime,
    pub vwap: &'a [f64],
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub levels: &'a SessionLevels,
    pub reclaim_bars: usize,
}

pub fn select(ctx: &SetupContext<'_>) -> Option<StrategyPick> {
    let last = ctx.candles.last()?;
    let close = last.close;
    let vwap = ctx.vwap.last().copied().filter(|v| v.is_finite());
    let above_vwap = vwap.is_some_and(|v| close > v);
    let below_vwap = vwap.is_some_and(|v| close < v);
    let (stack_up, stack_down) = match (ctx.ema20, ctx.ema50) {
        (Some(e20), Some(e50)) => (e20 > e50, e20 < e50),
        _ => (false, false),
    };
    let orh = ctx.levels.orh();
    let orl = ctx.levels.orl();

    if ctx.regime == Regime::TrendUp && orh.is_some_and(|h| close > h) && above_vwap && stack_up {
        return Some(StrategyPick {
            strategy: Strategy::OrbPullbackLong,
            structure_stop: max_opt(orl, swing_low(ctx.candles, 12)),
        });
    }

    if above_vwap && closes_above_vwap(ctx.candles, ctx.vwap, ctx.reclaim_bars) {
        return Some(StrategyPick {
            strategy: Strategy::VwapReclaimLong,
            structure_stop: swing_low(ctx.candles, 8),
        });
    }

    if ctx.levels.pdh().is_some_and(|h| close > h) && above_vwap && stack_up {
        return Some(StrategyPick {
            strategy: Strategy::PdhBreakHoldLong,
            structure_stop: max_opt(orl, swing_low(ctx.candles, 10)),
        });
    }

    if ctx.levels.pdl().is_some_and(|l| close < l) && below_vwap && stack_down {
        return Some(StrategyPick {
            strategy: Strategy::PdlBreakHoldShort,
            structure_stop: min_opt(orh, swing_high(ctx.candles, 10)),
        });
    }

    if ctx.regime == Regime::TrendDown && orl.is_some_and(|l| close < l) && below_vwap && stack_down {
        return Some(StrategyPick {
            strategy: Strategy::RangeBreakRetestShort,
            structure_stop: min_opt(orh, swing_high(ctx.candles, 12)),
        });
    }

    None
}

/// Last `n` closes all strictly above their VWAP.
fn closes_above_vwap(candles: &[Candle], vwap: &[f64], n: usize) -> bool {
    let n = n.max(1);
    if candles.len() < n || vwap.len() != candles.len() {
        return false;
    }
    let start = candles.len() - n;
    candles[start..]
        .iter()
        .zip(&vwap[start..])
        .all(|(c, v)| v.is_finite() && c.close > *v)
}

fn max_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, y) => x.or(y),
    }
}

fn min_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, y) => x.or(y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;
    use crate::levels::{OpeningRange, PrevDay};

    fn levels(orh: f64, orl: f64, pd: Option<(f64, f64)>) -> SessionLevels {
        SessionLevels {
            prev_day: pd.map(|(high, low)| PrevDay {
                high,
                low,
                close: (high + low) / 2.0,
            }),
            opening_range: Some(OpeningRange { high: orh, low: orl }),
        }
    }

    #[test]
    fn orb_pullback_in_trend_up() {
        let candles = make_candles(&[100.0, 101.0, 102.0, 103.0]);
        let lv = levels(101.0, 99.0, None);
        let ctx = SetupContext {
            candles: &candles,
            regime: Regime::TrendUp,
            vwap: &[100.0, 100.5, 101.0, 101.5],
            ema20: Some(102.0),
            ema50: Some(101.0),
            levels: &lv,
            reclaim_bars: 2,
        };
        let pick = select(&ctx).unwrap();
        assert_eq!(pick.strategy, Strategy::OrbPullbackLong);
        // max(ORL 99, swing low 99)
        assert_eq!(pick.structure_stop, Some(99.0));
        assert_eq!(pick.strategy.bias(), Side::Long);
    }

    #[test]
    fn vwap_reclaim_needs_consecutive_closes() {
        let candles = make_candles(&[100.0, 101.0, 102.0]);
        let lv = levels(105.0, 95.0, None);
        let mut ctx = SetupContext {
            candles: &candles,
            regime: Regime::Range,
            vwap: &[100.5, 100.5, 100.5],
            ema20: Some(101.0),
            ema50: Some(101.0),
            levels: &lv,
            reclaim_bars: 2,
        };
        assert_eq!(select(&ctx).map(|p| p.strategy), Some(Strategy::VwapReclaimLong));

        let vwap = [100.5, 101.5, 101.5];
        ctx.vwap = &vwap;
        assert_eq!(select(&ctx), None);
    }

    #[test]
    fn pdl_break_short() {
        let candles = make_candles(&[100.0, 99.0, 98.0]);
        let lv = levels(101.0, 98.5, Some((101.0, 98.5)));
        let ctx = SetupContext {
            candles: &candles,
            regime: Regime::Range,
            vwap: &[99.5, 99.5, 99.5],
            ema20: Some(99.0),
            ema50: Some(100.0),
            levels: &lv,
            reclaim_bars: 2,
        };
        let pick = select(&ctx).unwrap();
        assert_eq!(pick.strategy, Strategy::PdlBreakHoldShort);
        // min(ORH 101, swing high 101)
        assert_eq!(pick.structure_stop, Some(101.0));
    }

    #[test]
    fn range_break_short_in_trend_down() {
        let candles = make_candles(&[100.0, 99.0, 97.0]);
        let lv = levels(101.5, 98.0, None);
        let ctx = SetupContext {
            candles: &candles,
            regime: Regime::TrendDown,
            vwap: &[99.5, 99.5, 99.5],
            ema20: Some(98.5),
            ema50: Some(99.5),
            levels: &lv,
            reclaim_bars: 2,
        };
        let pick = select(&ctx).unwrap();
        assert_eq!(pick.strategy, Strategy::RangeBreakRetestShort);
        assert_eq!(pick.structure_stop, Some(101.0));
    }

    #[test]
    fn nothing_matches_in_chop() {
        let candles = make_candles(&[100.0, 100.0, 100.0]);
        let lv = levels(101.0, 99.0, None);
        let ctx = SetupContext {
            candles: &candles,
            regime: Regime::Choppy,
            vwap: &[100.0, 100.0, 100.0],
            ema20: Some(100.0),
            ema50: Some(100.0),
            levels: &lv,
            reclaim_bars: 2,
        };
        assert_eq!(select(&ctx), None);
    }
}
