//! Fixed-schema diagnostics row: one per trade, entry features plus the
//! final exit and the first T1 partial.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{ExitReason, OpenTrade, Side, TradeId};
use crate::engine::entry::EntrySignal;
use crate::engine::exits::ExitFill;
use crate::engine::TriggerType;
use crate::planner::Plan;
use crate::ranker::Ranked;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsRow {
    pub trade_id: TradeId,
    pub date: NaiveDate,
    pub symbol: String,
    pub side: Side,
    pub strategy: String,
    pub regime: String,
    pub qty: u64,
    pub investment: f64,
    pub entry_time: DateTime<FixedOffset>,
    pub entry_price: f64,
    pub stop: f64,
    pub t1: f64,
    pub t2: Option<f64>,
    pub rr_first: Option<f64>,
    pub entry_zone: String,
    pub confidence: f64,
    pub level_type: String,
    pub level_px: f64,
    pub rsi: Option<f64>,
    pub rsi_slope: f64,
    pub adx: Option<f64>,
    pub adx_slope: f64,
    pub ma20_slope: f64,
    pub above_vwap: bool,
    pub squeeze_pctile: Option<f64>,
    pub retest_ok: bool,
    pub vwap_hold: bool,
    pub atr5: f64,
    pub vwap: Option<f64>,
    pub volume_ratio: f64,
    pub score: f64,
    pub intraday_score: f64,
    pub rank_score: f64,
    pub rank: usize,
    pub trigger_type: TriggerType,
    pub dist_to_zone_bpct: f64,
    pub dist_from_level_bpct: f64,
    pub structural_rr: Option<f64>,
    /// Intraday and plan acceptance together, as gated at entry.
    pub acceptance_ok: bool,
    pub plan_acceptance_ok: bool,
    pub qty_scale: f64,
    pub cautions: String,
    pub pattern: Option<String>,
    pub fib_nearest: Option<f64>,
    pub missing_indicators: String,
    pub exit_time: Option<DateTime<FixedOffset>>,
    pub exit_reason: Option<ExitReason>,
    pub exit_price: Option<f64>,
    pub exit_qty: Option<u64>,
    pub pnl_per_share: Option<f64>,
    pub pnl_actual: Option<f64>,
    pub pnl_pct: Option<f64>,
    pub holding_minutes: Option<i64>,
    /// Sum over every exit of this trade.
    pub qty_exited: u64,
    pub realized_pnl: f64,
    pub t1_partial_time: Option<DateTime<FixedOffset>>,
    pub t1_partial_price: Option<f64>,
    pub t1_partial_qty: Option<u64>,
    pub t1_partial_pnl: Option<f64>,
}

impl DiagnosticsRow {
    pub fn entry(
        trade: &OpenTrade,
        plan: &Plan,
        ranked: &Ranked,
        rank: usize,
        signal: &EntrySignal,
    ) -> Self {
        let cand = &ranked.candidate;
        let f = &cand.features;
        let snapshot = &cand.snapshot;
        Self {
            trade_id: trade.trade_id.clone(),
            date: trade.entry_time.date_naive(),
            symbol: trade.symbol.clone(),
            side: trade.side,
            strategy: plan.strategy.to_string(),
            regime: plan.regime.to_string(),
            qty: trade.qty_initial,
            investment: trade.qty_initial as f64 * trade.entry_price,
            entry_time: trade.entry_time,
            entry_price: trade.entry_price,
            stop: trade.stop,
            t1: trade.t1,
            t2: trade.t2,
            rr_first: plan.rr_first(),
            entry_zone: plan.entry_zone.to_string(),
            confidence: plan.confidence,
            level_type: cand.level.kind.to_string(),
            level_px: cand.level.price,
            rsi: f.rsi,
            rsi_slope: f.rsi_slope,
            adx: f.adx,
            adx_slope: f.adx_slope,
            ma20_slope: f.ma20_slope,
            above_vwap: f.above_vwap,
            squeeze_pctile: f.squeeze_pctile,
            retest_ok: cand.acceptance.retest_ok,
            vwap_hold: cand.acceptance.hold_ok,
            atr5: cand.atr5,
            vwap: cand.vwap,
            volume_ratio: f.volume_ratio,
            score: cand.daily_score,
            intraday_score: ranked.intraday_score,
            rank_score: ranked.rank_score,
            rank,
            trigger_type: signal.trigger,
            dist_to_zone_bpct: signal.dist_to_zone_bpct,
            dist_from_level_bpct: cand.dist_from_level_bpct,
            structural_rr: plan.quality.structural_rr,
            acceptance_ok: cand.acceptance.ok() && plan.quality.acceptance_ok,
            plan_acceptance_ok: plan.quality.acceptance_ok,
            qty_scale: plan.qty_scale,
            cautions: plan.cautions.join(";"),
            pattern: snapshot.pattern.map(|p| p.to_string()),
            fib_nearest: snapshot
                .fib
                .as_ref()
                .and_then(|fib| fib.nearest_ratio(trade.entry_price)),
            missing_indicators: snapshot.missing_indicators.join(";"),
            exit_time: None,
            exit_reason: None,
            exit_price: None,
            exit_qty: None,
            pnl_per_share: None,
            pnl_actual: None,
            pnl_pct: None,
            holding_minutes: None,
            qty_exited: 0,
            realized_pnl: 0.0,
            t1_partial_time: None,
            t1_partial_price: None,
            t1_partial_qty: None,
            t1_partial_pnl: None,
        }
    }

    /// Fold one exit event into the row.
    pub fn apply_exit(&mut self, exit: &ExitFill) {
        self.exit_time = Some(exit.time);
        self.exit_reason = Some(exit.reason);
        self.exit_price = Some(exit.price);
        self.exit_qty = Some(exit.qty);
        self.pnl_per_share = Some(exit.pnl_per_share);
        self.pnl_actual = Some(exit.pnl_actual);
        self.pnl_pct = Some(exit.pnl_pct);
        self.holding_minutes = Some((exit.time - self.entry_time).num_minutes());
        self.qty_exited += exit.qty;
        self.realized_pnl += exit.pnl_actual;
        if exit.reason == ExitReason::T1Partial && self.t1_partial_time.is_none() {
            self.t1_partial_time = Some(exit.time);
            self.t1_partial_price = Some(exit.price);
            self.t1_partial_qty = Some(exit.qty);
            self.t1_partial_pnl = Some(exit.pnl_actual);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.qty_exited >= self.qty
    }
}
