//! Frozen run configuration.
//!
//! One `AppConfig` record carries every threshold used by the screener,
//! planner and session loop. Sections mirror the on-disk JSON/TOML layout:
//! - `precision_screener`: per-tick gate thresholds
//! - `intraday_gate`: soft bands feeding planner size penalties
//! - `late_entry_penalty`: overextension caps
//! - `risk`: capital and lot sizing
//! - `t2_decision`: runner-hold probability model
//! - `planner`: stop/target/zone geometry and regime thresholds
//! - `acceptance`: plan-level retest/hold check
//! - `engine`: tick schedule and entry trigger constants
//!
//! Every section has defaults so partial files deserialize; the runner's loader
//! enforces the required `risk` keys before this type is built.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::clock::hhmm;
use crate::domain::{TimeWindow, TrailRule};

/// Configuration errors (parse, missing keys, invalid values).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required config key '{0}'")]
    MissingKey(String),

    #[error("invalid config value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub precision_screener: PrecisionScreenerConfig,
    pub intraday_gate: IntradayGateConfig,
    pub late_entry_penalty: LateEntryPenaltyConfig,
    pub risk: RiskConfig,
    pub t2_decision: T2DecisionConfig,
    pub planner: PlannerConfig,
    pub acceptance: AcceptanceConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ps = &self.precision_screener;
        check_range("precision_screener.rsi_range", ps.rsi_range)?;
        check_range("precision_screener.adx_range", ps.adx_range)?;
        if ps.min_bars == 0 {
            return Err(invalid("precision_screener.min_bars", "must be at least 1"));
        }
        if ps.lunch_window.start > ps.lunch_window.end {
            return Err(invalid("precision_screener.lunch_window", "start after end"));
        }

        let gate = &self.intraday_gate;
        check_range("intraday_gate.rsi", [gate.min_rsi, gate.max_rsi])?;
        check_range("intraday_gate.adx", [gate.min_adx, gate.max_adx])?;

        let risk = &self.risk;
        if !(risk.risk_capital > 0.0) {
            return Err(invalid("risk.risk_capital", "must be positive"));
        }
        if !(risk.risk_pct_per_trade > 0.0 && risk.risk_pct_per_trade <= 1.0) {
            return Err(invalid("risk.risk_pct_per_trade", "must be in (0, 1]"));
        }
        if risk.round_lot == 0 {
            return Err(invalid("risk.round_lot", "must be at least 1"));
        }

        if !(0.0..=1.0).contains(&self.t2_decision.p2_baseline) {
            return Err(invalid("t2_decision.p2_baseline", "must be in [0, 1]"));
        }

        let planner = &self.planner;
        if planner.t1_rr <= 0.0 || planner.t2_rr <= planner.t1_rr {
            return Err(invalid("planner.t2_rr", "targets must satisfy 0 < t1_rr < t2_rr"));
        }
        if planner.chop_low >= planner.chop_high {
            return Err(invalid("planner.chop_low", "must be below chop_high"));
        }

        let engine = &self.engine;
        if engine.interval_min <= 0 {
            return Err(invalid("engine.interval_min", "must be positive"));
        }
        if engine.session_start >= engine.session_end {
            return Err(invalid("engine.session_start", "must be before session_end"));
        }
        if engine.top_n == 0 {
            return Err(invalid("engine.top_n", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn check_range(key: &str, [lo, hi]: [f64; 2]) -> Result<(), ConfigError> {
    if lo.is_nan() || hi.is_nan() || lo > hi {
        return Err(invalid(key, "expected [lo, hi] with lo <= hi"));
    }
    Ok(())
}

// ─── Screener ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecisionScreenerConfig {
    /// Breakout buffer above the level, in percent.
    pub buffer_bpct: f64,
    pub min_vol_ratio: f64,
    /// VWAP grace in percent; falls back to `intraday_gate.vwap_relax_bpct`.
    pub vwap_grace_bpct: Option<f64>,
    pub rsi_range: [f64; 2],
    pub adx_range: [f64; 2],
    pub ma20_min_slope: f64,
    pub max_breakout_dist_bpct: f64,
    pub confirm_bars: usize,
    pub retest_bpct: f64,
    pub lunch_window: TimeWindow,
    #[serde(with = "hhmm")]
    pub late_cutoff: NaiveTime,
    /// Minimum contiguous 5-minute bars required at a tick.
    pub min_bars: usize,
}

impl Default for PrecisionScreenerConfig {
    fn default() -> Self {
        Self {
            buffer_bpct: 0.08,
            min_vol_ratio: 1.3,
            vwap_grace_bpct: None,
            rsi_range: [50.0, 75.0],
            adx_range: [15.0, 45.0],
            ma20_min_slope: 0.0,
            max_breakout_dist_bpct: 1.5,
            confirm_bars: 2,
            retest_bpct: 0.15,
            lunch_window: TimeWindow::new(hm(12, 15), hm(13, 15)),
            late_cutoff: hm(15, 0),
            min_bars: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntradayGateConfig {
    pub min_volume_ratio: f64,
    pub require_above_vwap: bool,
    pub vwap_relax_bpct: f64,
    pub min_rsi: f64,
    pub max_rsi: f64,
    pub min_adx: f64,
    pub max_adx: f64,
}

impl Default for IntradayGateConfig {
    fn default() -> Self {
        Self {
            min_volume_ratio: 1.3,
            require_above_vwap: true,
            vwap_relax_bpct: 0.2,
            min_rsi: 50.0,
            max_rsi: 72.0,
            min_adx: 18.0,
            max_adx: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LateEntryPenaltyConfig {
    pub rsi_above: Option<f64>,
    pub macd_above: Option<f64>,
}

impl Default for LateEntryPenaltyConfig {
    fn default() -> Self {
        Self {
            rsi_above: Some(72.0),
            macd_above: None,
        }
    }
}

// ─── Risk ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub risk_capital: f64,
    pub risk_pct_per_trade: f64,
    pub min_qty: u64,
    pub round_lot: u64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_capital: 100_000.0,
            risk_pct_per_trade: 0.005,
            min_qty: 1,
            round_lot: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct T2DecisionConfig {
    /// Evaluate the runner-hold decision after a T1 partial.
    pub enabled: bool,
    pub p2_baseline: f64,
}

impl Default for T2DecisionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            p2_baseline: 0.45,
        }
    }
}

// ─── Planner ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub atr_period: usize,
    pub choppiness_lookback: usize,
    pub chop_high: f64,
    pub chop_low: f64,
    pub entry_zone_atr_frac: f64,
    pub vwap_reclaim_min_bars_above: usize,
    pub sl_atr_mult: f64,
    /// Extra distance beyond the structure stop, in price units.
    pub sl_below_swing_ticks: f64,
    pub t1_rr: f64,
    pub t2_rr: f64,
    /// e.g. "book_30%"; parsed into the T1 book fraction.
    pub t1_action: String,
    pub trail_to: TrailRule,
    pub min_tick: f64,
    pub rr_clip_max: f64,
    pub opening_range_min: i64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            choppiness_lookback: 30,
            chop_high: 61.8,
            chop_low: 38.2,
            entry_zone_atr_frac: 0.15,
            vwap_reclaim_min_bars_above: 2,
            sl_atr_mult: 1.25,
            sl_below_swing_ticks: 0.0,
            t1_rr: 1.2,
            t2_rr: 2.0,
            t1_action: "book_30%".to_string(),
            trail_to: TrailRule::VwapOrEma20,
            min_tick: 0.05,
            rr_clip_max: 6.0,
            opening_range_min: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceConfig {
    pub bars: usize,
    pub retest_bpct: f64,
    pub need_vwap_hold: bool,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            bars: 2,
            retest_bpct: 0.15,
            need_vwap_hold: true,
        }
    }
}

// ─── Engine ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub top_n: usize,
    pub interval_min: i64,
    /// Market open; anchors VWAP and the opening range.
    #[serde(with = "hhmm")]
    pub market_open: NaiveTime,
    /// First evaluation tick.
    #[serde(with = "hhmm")]
    pub session_start: NaiveTime,
    /// Last evaluation tick and force-flatten time.
    #[serde(with = "hhmm")]
    pub session_end: NaiveTime,
    pub lookback_min: i64,
    pub prox_entry_bpct: f64,
    pub lunch_prox_bpct: f64,
    pub enable_breakout: bool,
    pub breakout_min_vr: f64,
    /// Ratchet stops toward VWAP/EMA20 after T1.
    pub apply_trail: bool,
    /// Flat cost placeholder charged on both legs of every exit.
    pub slippage_bps: f64,
    pub min_score_gap_to_replace: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_n: 7,
            interval_min: 5,
            market_open: hm(9, 15),
            session_start: hm(9, 20),
            session_end: hm(15, 15),
            lookback_min: 90,
            prox_entry_bpct: 0.15,
            lunch_prox_bpct: 0.10,
            enable_breakout: true,
            breakout_min_vr: 1.6,
            apply_trail: false,
            slippage_bps: 0.0,
            min_score_gap_to_replace: 0.5,
        }
    }
}
