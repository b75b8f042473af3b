//! Precision screener.
//!
//! For each daily candidate at a tick: fetch the session's 5-minute bars,
//! build a snapshot, resolve the reference level and run the staged gate in
//! [`gate`]. Data gaps drop the symbol for this tick; authentication failures
//! abort the caller.
//!
//! The screener holds no state between calls, so screening the same inputs
//! twice yields the same candidates in the same order.

pub mod gate;

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::acceptance::Acceptance;
use crate::config::AppConfig;
use crate::data::{CandleStore, DataError};
use crate::domain::{ist, ist_datetime, Candle, Interval, Side, Suggestion};
use crate::levels::{ReferenceLevel, SessionLevels};
use crate::session::{IntradayFeatures, SessionSnapshot};

pub use gate::{gate, trailing_contiguous};

/// Calendar days searched backwards for the prior session's daily bar.
const PREV_DAY_SEARCH_DAYS: i64 = 10;

/// A symbol that survived every gate at one tick.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub symbol: String,
    pub daily_score: f64,
    pub bias: Side,
    pub level: ReferenceLevel,
    pub levels: SessionLevels,
    pub features: IntradayFeatures,
    /// Retest-and-hold against the reference level.
    pub acceptance: Acceptance,
    pub last_close: f64,
    pub vwap: Option<f64>,
    pub atr5: f64,
    pub dist_from_level_bpct: f64,
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    FetchSkip,
    TimeGate,
    GateFail,
    LevelFail,
    BreakFail,
    ConfirmFail,
    ChaseFail,
}

/// Per-stage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStats {
    pub start: u32,
    pub fetch_skip: u32,
    pub time_gate: u32,
    pub gate_fail: u32,
    pub level_fail: u32,
    pub break_fail: u32,
    pub confirm_fail: u32,
    pub chase_fail: u32,
    pub final_pass: u32,
}

impl GateStats {
    pub fn record(&mut self, rejection: Rejection) {
        let slot = match rejection {
            Rejection::FetchSkip => &mut self.fetch_skip,
            Rejection::TimeGate => &mut self.time_gate,
            Rejection::GateFail => &mut self.gate_fail,
            Rejection::LevelFail => &mut self.level_fail,
            Rejection::BreakFail => &mut self.break_fail,
            Rejection::ConfirmFail => &mut self.confirm_fail,
            Rejection::ChaseFail => &mut self.chase_fail,
        };
        *slot += 1;
    }

    pub fn merge(&mut self, other: &GateStats) {
        self.start += other.start;
        self.fetch_skip += other.fetch_skip;
        self.time_gate += other.time_gate;
        self.gate_fail += other.gate_fail;
        self.level_fail += other.level_fail;
        self.break_fail += other.break_fail;
        self.confirm_fail += other.confirm_fail;
        self.chase_fail += other.chase_fail;
        self.final_pass += other.final_pass;
    }
}

impl fmt::Display for GateStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "start={} | fetch_skip={} | time_gate={} | gate_fail={} | level_fail={} | break_fail={} | confirm_fail={} | chase_fail={} | final_pass={}",
            self.start,
            self.fetch_skip,
            self.time_gate,
            self.gate_fail,
            self.level_fail,
            self.break_fail,
            self.confirm_fail,
            self.chase_fail,
            self.final_pass
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScreenOutcome {
    pub candidates: Vec<Candidate>,
    pub stats: GateStats,
}

/// Fetch window for a tick: from the earlier of `tick - lookback` and the
/// market open, so session VWAP and the opening range are always covered.
pub fn session_window(
    tick: DateTime<FixedOffset>,
    config: &AppConfig,
) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let open = ist_datetime(tick.with_timezone(&ist()).date_naive(), config.engine.market_open);
    let from = (tick - Duration::minutes(config.engine.lookback_min)).min(open);
    (from, tick)
}

/// Session 5-minute bars for `symbol` up to `tick`.
pub fn fetch_session(
    store: &dyn CandleStore,
    symbol: &str,
    tick: DateTime<FixedOffset>,
    config: &AppConfig,
) -> Result<Vec<Candle>, DataError> {
    let (from, to) = session_window(tick, config);
    store.fetch(symbol, Interval::FiveMinute, from, to)
}

/// Most recent daily bar strictly before `date`.
pub fn fetch_prev_day(
    store: &dyn CandleStore,
    symbol: &str,
    date: NaiveDate,
) -> Result<Option<Candle>, DataError> {
    let day_start = ist_datetime(date, chrono::NaiveTime::MIN);
    let from = day_start - Duration::days(PREV_DAY_SEARCH_DAYS);
    let to = day_start - Duration::seconds(1);
    let bars = store.fetch(symbol, Interval::Day, from, to)?;
    Ok(bars.into_iter().last())
}

pub struct PrecisionScreener<'a> {
    store: &'a dyn CandleStore,
    config: &'a AppConfig,
}

impl<'a> PrecisionScreener<'a> {
    pub fn new(store: &'a dyn CandleStore, config: &'a AppConfig) -> Self {
        Self { store, config }
    }

    /// Screen every suggestion at `tick`, preserving suggestion order.
    pub fn screen(
        &self,
        suggestions: &[Suggestion],
        tick: DateTime<FixedOffset>,
    ) -> Result<ScreenOutcome, DataError> {
        let mut outcome = ScreenOutcome::default();
        for suggestion in suggestions {
            if suggestion.symbol.trim().is_empty() {
                continue;
            }
            outcome.stats.start += 1;
            match self.screen_symbol(suggestion, tick)? {
                Ok(candidate) => {
                    outcome.stats.final_pass += 1;
                    debug!(
                        symbol = %candidate.symbol,
                        level = %candidate.level.kind,
                        level_px = candidate.level.price,
                        dist = candidate.dist_from_level_bpct,
                        "passed precision gate"
                    );
                    outcome.candidates.push(candidate);
                }
                Err(rejection) => outcome.stats.record(rejection),
            }
        }
        debug!(tick = %tick, "[screener] {}", outcome.stats);
        Ok(outcome)
    }

    /// Outer error: authentication only. Inner error: why the symbol was dropped.
    fn screen_symbol(
        &self,
        suggestion: &Suggestion,
        tick: DateTime<FixedOffset>,
    ) -> Result<Result<Candidate, Rejection>, DataError> {
        let symbol = suggestion.symbol.as_str();
        let bars = match fetch_session(self.store, symbol, tick, self.config) {
            Ok(bars) => bars,
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                debug!(symbol, error = %e, "5m fetch failed, treating as data gap");
                return Ok(Err(Rejection::FetchSkip));
            }
        };
        let snapshot = SessionSnapshot::build(symbol, &bars, tick, self.config);

        let date = tick.with_timezone(&ist()).date_naive();
        let prev_day = match fetch_prev_day(self.store, symbol, date) {
            Ok(bar) => bar,
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                warn!(symbol, error = %e, "daily fetch failed, falling back to opening range");
                None
            }
        };
        let levels = SessionLevels::extract(
            &snapshot.candles,
            prev_day.as_ref(),
            self.config.engine.market_open,
            self.config.planner.opening_range_min,
        );
        Ok(gate(snapshot, levels, suggestion.score, self.config))
    }
}
