//! Exit evaluation for one open trade against one new bar.
//!
//! Order within a bar is fixed: STOP, then T1 (full or partial, followed by
//! the optional runner-hold decision), then T2. The stop is assumed touched
//! before any target inside the same bar. A T2 can fill on the same bar as
//! the T1 partial. The trail ratchet runs last and only affects later bars.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::runner_hold;
use crate::config::AppConfig;
use crate::domain::{Candle, ExitReason, OpenTrade, Side, TradeId, TrailRule};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitFill {
    pub trade_id: TradeId,
    pub symbol: String,
    pub side: Side,
    pub reason: ExitReason,
    pub price: f64,
    pub qty: u64,
    pub time: DateTime<FixedOffset>,
    /// Net of slippage on both legs.
    pub pnl_per_share: f64,
    pub pnl_actual: f64,
    pub pnl_pct: f64,
}

/// Bar-level context used by the trail rule.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrailContext {
    pub vwap: Option<f64>,
    pub ema20: Option<f64>,
}

/// Close `qty` of `trade` at `price` and price the fill.
pub fn fill(
    trade: &mut OpenTrade,
    reason: ExitReason,
    price: f64,
    qty: u64,
    time: DateTime<FixedOffset>,
    slippage_bps: f64,
) -> ExitFill {
    let moved = trade.close_qty(qty);
    let slippage = (trade.entry_price + price) * slippage_bps / 10_000.0;
    let pnl_per_share = trade.pnl_per_share(price) - slippage;
    let pnl_pct = if trade.entry_price != 0.0 {
        pnl_per_share / trade.entry_price * 100.0
    } else {
        0.0
    };
    ExitFill {
        trade_id: trade.trade_id.clone(),
        symbol: trade.symbol.clone(),
        side: trade.side,
        reason,
        price,
        qty: moved,
        time,
        pnl_per_share,
        pnl_actual: pnl_per_share * moved as f64,
        pnl_pct,
    }
}

/// Evaluate `bar` against `trade`, mutating it and returning the fills in order.
///
/// The caller removes the trade once it is flat.
pub fn evaluate_exits(
    trade: &mut OpenTrade,
    bar: &Candle,
    trail: TrailContext,
    config: &AppConfig,
) -> Vec<ExitFill> {
    let slippage = config.engine.slippage_bps;
    let mut fills = Vec::new();
    trade.last_bar_ts = Some(bar.timestamp);
    if trade.is_flat() {
        return fills;
    }

    let (stop, t1) = (trade.stop, trade.t1);

    if trade.stop_hit(bar) {
        let qty = trade.qty_open;
        fills.push(fill(trade, ExitReason::Stop, stop, qty, bar.timestamp, slippage));
        return fills;
    }

    if !trade.t1_done && trade.t1_hit(bar) {
        let open = trade.qty_open;
        let part = ((open as f64 * trade.t1_book_fraction).round() as u64).clamp(1, open);
        if part >= open {
            fills.push(fill(trade, ExitReason::T1Full, t1, open, bar.timestamp, slippage));
            return fills;
        }
        fills.push(fill(trade, ExitReason::T1Partial, t1, part, bar.timestamp, slippage));
        trade.t1_done = true;

        if config.t2_decision.enabled {
            if let Some(t2) = trade.t2 {
                let p2 = runner_hold::p2(
                    &trade.meta,
                    bar.session_time(),
                    config.t2_decision.p2_baseline,
                );
                if !runner_hold::keep_runner(p2, trade.side, stop, t1, t2) {
                    let rest = trade.qty_open;
                    fills.push(fill(
                        trade,
                        ExitReason::RunnerExit,
                        t1,
                        rest,
                        bar.timestamp,
                        slippage,
                    ));
                    return fills;
                }
            }
        }
    }

    if trade.t1_done && trade.qty_open > 0 && trade.t2_hit(bar) {
        if let Some(t2) = trade.t2 {
            let rest = trade.qty_open;
            fills.push(fill(trade, ExitReason::T2, t2, rest, bar.timestamp, slippage));
            return fills;
        }
    }

    if config.engine.apply_trail && trade.t1_done && trade.trail_mode == TrailRule::VwapOrEma20 {
        ratchet_stop(trade, bar.close, trail);
    }
    fills
}

/// Move the stop to the tightest of VWAP/EMA20 still on the safe side of
/// `close`. Never loosens.
pub fn ratchet_stop(trade: &mut OpenTrade, close: f64, ctx: TrailContext) {
    let anchors = [ctx.vwap, ctx.ema20];
    let anchors = anchors.iter().flatten().copied().filter(|v| v.is_finite());
    match trade.side {
        Side::Long => {
            if let Some(anchor) = anchors.filter(|v| *v < close).reduce(f64::max) {
                trade.stop = trade.stop.max(anchor);
            }
        }
        Side::Short => {
            if let Some(anchor) = anchors.filter(|v| *v > close).reduce(f64::min) {
                trade.stop = trade.stop.min(anchor);
            }
        }
    }
}
