//! One trading day, tick by tick.
//!
//! Per tick the order is fixed:
//! 1. exits for every open trade against its newest unseen bar
//! 2. screener → ranker → planner → entry triggers (skipped from the late cutoff)
//!
//! A symbol that exited on this tick cannot re-enter until the next one.
//! After the last tick every remaining trade is force-flattened at
//! `session_end` on the last known close (entry price when no bar exists).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::entry;
use super::exits::{self, evaluate_exits, ExitFill, TrailContext};
use super::ticks::{in_lunch, past_late_cutoff, session_ticks};
use crate::config::AppConfig;
use crate::data::{CandleStore, DataError};
use crate::diagnostics::{DiagnosticsRecorder, DiagnosticsRow};
use crate::domain::{
    ist_datetime, Candle, ExitReason, OpenTrade, Side, Suggestion, TradeId, TradeMeta,
};
use crate::indicators::ema::ema_of_series;
use crate::indicators::{closes, Indicator, Vwap};
use crate::planner::{position_size, PlanOutcome, TradePlanner};
use crate::ranker::rank;
use crate::screener::{fetch_session, GateStats, PrecisionScreener};
use crate::trade_log::TradeEvent;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("authentication failed on {date}: {source}")]
    Authentication {
        date: NaiveDate,
        #[source]
        source: DataError,
    },
}

/// Inputs for one day's run. The store is shared read-only.
pub struct DaySession<'a> {
    pub date: NaiveDate,
    pub store: &'a dyn CandleStore,
    pub suggestions: &'a [Suggestion],
    pub config: &'a AppConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayReport {
    pub date: NaiveDate,
    pub ticks: usize,
    pub entries: usize,
    pub exit_events: usize,
    pub no_setups: usize,
    pub gate_stats: GateStats,
    pub events: Vec<TradeEvent>,
}

impl DayReport {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            ticks: 0,
            entries: 0,
            exit_events: 0,
            no_setups: 0,
            gate_stats: GateStats::default(),
            events: Vec::new(),
        }
    }
}

type OpenBook = BTreeMap<(String, Side), OpenTrade>;

/// Run one day, writing entries and exits into `recorder`.
pub fn run_day_session(
    session: &DaySession<'_>,
    recorder: &mut DiagnosticsRecorder,
) -> Result<DayReport, EngineError> {
    let cfg = session.config;
    let date = session.date;
    let screener = PrecisionScreener::new(session.store, cfg);
    let planner = TradePlanner::new(cfg);

    let mut report = DayReport::new(date);
    let mut open: OpenBook = BTreeMap::new();
    let mut seq: u32 = 0;

    for tick in session_ticks(date, &cfg.engine) {
        report.ticks += 1;

        // ─── Exits ───
        let mut exited: BTreeSet<String> = BTreeSet::new();
        let keys: Vec<(String, Side)> = open.keys().cloned().collect();
        for key in keys {
            let Some(bars) = day_bars(session, &key.0, tick)? else {
                continue;
            };
            let Some(trade) = open.get_mut(&key) else {
                continue;
            };
            let seen = trade.last_bar_ts;
            let Some(idx) = bars
                .iter()
                .rposition(|c| seen.map_or(true, |ts| c.timestamp > ts))
            else {
                continue;
            };
            let trail = if cfg.engine.apply_trail && trade.t1_done {
                trail_context(&bars[..=idx])
            } else {
                TrailContext::default()
            };
            let fills = evaluate_exits(trade, &bars[idx], trail, cfg);
            let flat = trade.is_flat();
            for fill in &fills {
                record_exit(fill, recorder, &mut report);
            }
            if flat {
                open.remove(&key);
                exited.insert(key.0);
            }
        }

        // ─── Entries ───
        if past_late_cutoff(tick, &cfg.precision_screener) {
            continue;
        }
        let outcome = screener
            .screen(session.suggestions, tick)
            .map_err(|source| EngineError::Authentication { date, source })?;
        report.gate_stats.merge(&outcome.stats);

        let prox_bpct = if in_lunch(tick, &cfg.precision_screener) {
            cfg.engine.lunch_prox_bpct
        } else {
            cfg.engine.prox_entry_bpct
        };

        for (i, ranked) in rank(outcome.candidates, cfg.engine.top_n).iter().enumerate() {
            let cand = &ranked.candidate;
            let symbol = cand.symbol.as_str();
            if exited.contains(symbol) {
                continue;
            }
            let plan = match planner.plan_candidate(cand) {
                PlanOutcome::Plan(plan) => plan,
                PlanOutcome::NoSetup(reason) => {
                    report.no_setups += 1;
                    debug!(symbol, %reason, "no setup");
                    continue;
                }
            };
            let key = (symbol.to_string(), plan.bias);
            if open.contains_key(&key) {
                continue;
            }
            if !(plan.quality.acceptance_ok && cand.acceptance.ok()) {
                debug!(
                    symbol,
                    plan_ok = plan.quality.acceptance_ok,
                    intraday_ok = cand.acceptance.ok(),
                    "acceptance gate blocked entry"
                );
                continue;
            }
            let Some(bar) = cand.snapshot.last_bar() else {
                continue;
            };
            let Some(signal) = entry::detect(bar, &plan, cand, prox_bpct, &cfg.engine) else {
                continue;
            };

            let risk_per_share = (signal.price - plan.hard_stop) * plan.bias.sign();
            let qty = position_size(&cfg.risk, risk_per_share, plan.qty_scale);
            if qty == 0 {
                debug!(symbol, price = signal.price, "zero quantity at fill price");
                continue;
            }

            seq += 1;
            let mut trade = OpenTrade::new(
                TradeId::compose(symbol, tick, seq),
                symbol,
                plan.bias,
                qty,
                signal.price,
                tick,
                plan.hard_stop,
                plan.t1(),
                plan.t2(),
                plan.t1_book_fraction,
            );
            trade.trail_mode = plan.trail;
            trade.meta = TradeMeta {
                adx: cand.features.adx,
                adx_slope: cand.features.adx_slope,
                rsi: cand.features.rsi,
                rsi_slope: cand.features.rsi_slope,
                volume_ratio: cand.features.volume_ratio,
                squeeze_pctile: cand.features.squeeze_pctile,
                strategy: plan.strategy.to_string(),
            };

            recorder.record_entry(DiagnosticsRow::entry(&trade, &plan, ranked, i + 1, &signal));
            let event = TradeEvent::entry(&trade, &plan, &signal);
            event.emit();
            report.events.push(event);
            report.entries += 1;
            open.insert(key, trade);
        }
    }

    flatten_all(session, &mut open, recorder, &mut report)?;

    info!(
        %date,
        ticks = report.ticks,
        entries = report.entries,
        exits = report.exit_events,
        no_setups = report.no_setups,
        "day complete"
    );
    Ok(report)
}

/// Close every open trade at `session_end`.
fn flatten_all(
    session: &DaySession<'_>,
    open: &mut OpenBook,
    recorder: &mut DiagnosticsRecorder,
    report: &mut DayReport,
) -> Result<(), EngineError> {
    let end = ist_datetime(session.date, session.config.engine.session_end);
    for ((symbol, _), mut trade) in std::mem::take(open) {
        let price = day_bars(session, &symbol, end)?
            .and_then(|bars| bars.last().map(|c| c.close))
            .unwrap_or(trade.entry_price);
        let qty = trade.qty_open;
        let fill = exits::fill(
            &mut trade,
            ExitReason::Eod,
            price,
            qty,
            end,
            session.config.engine.slippage_bps,
        );
        record_exit(&fill, recorder, report);
    }
    Ok(())
}

fn record_exit(fill: &ExitFill, recorder: &mut DiagnosticsRecorder, report: &mut DayReport) {
    recorder.record_exit(fill);
    let event = TradeEvent::exit(fill);
    event.emit();
    report.events.push(event);
    report.exit_events += 1;
}

/// Today's bars for `symbol` up to `tick`. Data gaps yield `None`;
/// authentication failures abort the day.
fn day_bars(
    session: &DaySession<'_>,
    symbol: &str,
    tick: DateTime<FixedOffset>,
) -> Result<Option<Vec<Candle>>, EngineError> {
    match fetch_session(session.store, symbol, tick, session.config) {
        Ok(bars) => {
            let bars: Vec<Candle> = bars
                .into_iter()
                .filter(|c| c.timestamp <= tick && c.session_date() == session.date)
                .collect();
            Ok((!bars.is_empty()).then_some(bars))
        }
        Err(e) if e.is_auth() => Err(EngineError::Authentication {
            date: session.date,
            source: e,
        }),
        Err(e) => {
            debug!(symbol, error = %e, "bar fetch failed, skipping exits this tick");
            Ok(None)
        }
    }
}

fn trail_context(bars: &[Candle]) -> TrailContext {
    let last_finite = |v: Vec<f64>| v.last().copied().filter(|x| x.is_finite());
    TrailContext {
        vwap: last_finite(Vwap::new().compute(bars)),
        ema20: last_finite(ema_of_series(&closes(bars), 20)),
    }
}
