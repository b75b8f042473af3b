//! Trade planner: session features in, concrete plan or "no setup" out.
//!
//! Pipeline:
//! - regime from choppiness and the EMA stack
//! - first matching strategy and its structural stop
//! - hard stop: the wider of structure and `sl_atr_mult · ATR`
//! - targets at `t1_rr` / `t2_rr` multiples of risk per share
//! - entry zone of `entry_zone_atr_frac · ATR` around the reference price
//! - risk-based size with late-entry penalties
//!
//! The planner never gates on the penalties; they only shrink size.

pub mod regime;
pub mod sizing;
pub mod strategy;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::acceptance;
use crate::config::AppConfig;
use crate::domain::{Side, TrailRule};
use crate::levels::{ReferenceLevel, SessionLevels};
use crate::screener::Candidate;
use crate::session::{cols, SessionSnapshot};

pub use regime::Regime;
pub use sizing::{late_entry_penalty, parse_book_fraction, position_size, SizePenalty};
pub use strategy::{SetupContext, Strategy, StrategyPick};

/// ATR stand-in, as a fraction of price, when ATR is unavailable.
pub const ATR_FALLBACK_FRAC: f64 = 0.005;
/// Minimum half-width of the entry zone.
pub const MIN_ZONE_WIDTH: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub level: f64,
    pub rr: f64,
    pub action: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryZone {
    pub lo: f64,
    pub hi: f64,
}

impl EntryZone {
    pub fn mid(&self) -> f64 {
        (self.lo + self.hi) / 2.0
    }
}

impl fmt::Display for EntryZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.2}, {:.2}]", self.lo, self.hi)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanQuality {
    pub structural_rr: Option<f64>,
    pub acceptance_ok: bool,
    pub retest_ok: bool,
    pub hold_ok: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub symbol: String,
    pub bias: Side,
    pub regime: Regime,
    pub strategy: Strategy,
    /// Last close the plan was built from.
    pub reference_price: f64,
    pub entry_zone: EntryZone,
    pub hard_stop: f64,
    pub structure_stop: f64,
    /// T1 then T2.
    pub targets: Vec<Target>,
    pub trail: TrailRule,
    pub risk_per_share: f64,
    pub qty: u64,
    pub qty_scale: f64,
    pub t1_book_fraction: f64,
    /// Opening-range edge on the bias side; acceptance and short breakouts
    /// are measured against it.
    pub key_level: f64,
    pub atr: f64,
    pub atr_fallback: bool,
    /// 0.60 base, +0.15 above VWAP, +0.15 within 0.4% of the level; capped at 0.95.
    pub confidence: f64,
    pub quality: PlanQuality,
    pub cautions: Vec<String>,
}

impl Plan {
    pub fn t1(&self) -> f64 {
        self.targets.first().map(|t| t.level).unwrap_or(f64::NAN)
    }

    pub fn t2(&self) -> Option<f64> {
        self.targets.get(1).map(|t| t.level)
    }

    /// First-target reward over risk.
    pub fn rr_first(&self) -> Option<f64> {
        self.targets.first().map(|t| t.rr)
    }

    pub fn notional(&self) -> f64 {
        self.qty as f64 * self.reference_price
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoSetupReason {
    EmptySession,
    NoStrategy,
    MissingStructureStop,
    NonPositiveRisk,
    RiskBelowTick,
    ZeroQty,
    InvalidLevels,
}

impl NoSetupReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoSetupReason::EmptySession => "empty_session",
            NoSetupReason::NoStrategy => "no_strategy",
            NoSetupReason::MissingStructureStop => "missing_structure_stop",
            NoSetupReason::NonPositiveRisk => "non_positive_risk",
            NoSetupReason::RiskBelowTick => "risk_below_tick",
            NoSetupReason::ZeroQty => "zero_qty",
            NoSetupReason::InvalidLevels => "invalid_levels",
        }
    }
}

impl fmt::Display for NoSetupReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    Plan(Plan),
    NoSetup(NoSetupReason),
}

impl PlanOutcome {
    pub fn plan(self) -> Option<Plan> {
        match self {
            PlanOutcome::Plan(p) => Some(p),
            PlanOutcome::NoSetup(_) => None,
        }
    }
}

/// Check stop < zone.lo <= zone.hi < T1 < T2 for long, mirrored for short.
pub fn validate_plan(plan: &Plan) -> Result<(), String> {
    let EntryZone { lo, hi } = plan.entry_zone;
    let t1 = plan.t1();
    let t2 = plan.t2().unwrap_or(f64::NAN);
    let stop = plan.hard_stop;
    let ordered = match plan.bias {
        Side::Long => stop < lo && lo <= hi && hi < t1 && t1 < t2,
        Side::Short => stop > hi && hi >= lo && lo > t1 && t1 > t2,
    };
    if ordered {
        Ok(())
    } else {
        Err(format!(
            "{} {}: stop={stop:.2} zone=[{lo:.2}, {hi:.2}] t1={t1:.2} t2={t2:.2}",
            plan.symbol, plan.bias
        ))
    }
}

fn plan_confidence(close: f64, vwap: Option<f64>, level: Option<f64>) -> f64 {
    let mut conf: f64 = 0.60;
    if vwap.is_some_and(|v| close > v) {
        conf += 0.15;
    }
    if level.is_some_and(|l| l > 0.0 && (close / l - 1.0).abs() <= 0.004) {
        conf += 0.15;
    }
    round2(conf.min(0.95))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub struct TradePlanner<'a> {
    config: &'a AppConfig,
}

impl<'a> TradePlanner<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    pub fn plan_candidate(&self, candidate: &Candidate) -> PlanOutcome {
        self.plan(&candidate.snapshot, &candidate.levels, Some(&candidate.level))
    }

    pub fn plan(
        &self,
        snapshot: &SessionSnapshot,
        levels: &SessionLevels,
        reference: Option<&ReferenceLevel>,
    ) -> PlanOutcome {
        let pc = &self.config.planner;
        let symbol = snapshot.symbol.as_str();
        let Some(last) = snapshot.last_bar() else {
            return PlanOutcome::NoSetup(NoSetupReason::EmptySession);
        };
        let Some(features) = snapshot.features() else {
            return PlanOutcome::NoSetup(NoSetupReason::EmptySession);
        };
        let price = last.close;

        let regime = regime::classify(
            snapshot.last(cols::CHOP),
            snapshot.series(cols::EMA20),
            snapshot.series(cols::EMA50),
            pc,
        );
        let ctx = SetupContext {
            candles: &snapshot.candles,
            regime,
            vwap: snapshot.series(cols::VWAP),
            ema20: features.ema20,
            ema50: features.ema50,
            levels,
            reclaim_bars: pc.vwap_reclaim_min_bars_above,
        };
        let Some(pick) = strategy::select(&ctx) else {
            debug!(symbol, %regime, "no setup");
            return PlanOutcome::NoSetup(NoSetupReason::NoStrategy);
        };
        let Some(structure_stop) = pick.structure_stop.filter(|v| v.is_finite()) else {
            return PlanOutcome::NoSetup(NoSetupReason::MissingStructureStop);
        };
        let bias = pick.strategy.bias();
        let sign = bias.sign();

        let (atr, atr_fallback) = match snapshot.last(cols::ATR).filter(|a| *a > 0.0) {
            Some(a) => (a, false),
            None => {
                warn!(symbol, price, "ATR unavailable, using fallback");
                (price * ATR_FALLBACK_FRAC, true)
            }
        };

        let vol_stop = price - sign * pc.sl_atr_mult * atr;
        let hard_stop = match bias {
            Side::Long => (structure_stop - pc.sl_below_swing_ticks).min(vol_stop),
            Side::Short => (structure_stop + pc.sl_below_swing_ticks).max(vol_stop),
        };
        let risk_per_share = (price - hard_stop) * sign;
        if !(risk_per_share > 0.0) {
            return PlanOutcome::NoSetup(NoSetupReason::NonPositiveRisk);
        }
        if risk_per_share < pc.min_tick {
            return PlanOutcome::NoSetup(NoSetupReason::RiskBelowTick);
        }

        let penalty = late_entry_penalty(
            &features,
            &self.config.late_entry_penalty,
            &self.config.intraday_gate,
        );
        let qty = position_size(&self.config.risk, risk_per_share, penalty.qty_scale);
        if qty == 0 {
            return PlanOutcome::NoSetup(NoSetupReason::ZeroQty);
        }

        let t1 = price + sign * pc.t1_rr * risk_per_share;
        let t2 = price + sign * pc.t2_rr * risk_per_share;
        let entry_zone = if atr_fallback {
            EntryZone {
                lo: round2(price - MIN_ZONE_WIDTH),
                hi: round2(price),
            }
        } else {
            let w = (atr * pc.entry_zone_atr_frac).max(MIN_ZONE_WIDTH);
            EntryZone {
                lo: round2(price - w),
                hi: round2(price + w),
            }
        };

        let reference_px = reference.map(|r| r.price);
        let key_level = match bias {
            Side::Long => levels.orh().or(reference_px),
            Side::Short => levels.orl(),
        };
        let acc_cfg = &self.config.acceptance;
        let acc = match key_level {
            Some(level) => acceptance::evaluate(
                &snapshot.candles,
                features.vwap,
                level,
                bias,
                acc_cfg.bars,
                acc_cfg.retest_bpct,
                acc_cfg.need_vwap_hold,
            ),
            None => acceptance::Acceptance::default(),
        };

        let measured_move = match (levels.orh(), levels.orl()) {
            (Some(h), Some(l)) => (h - l).max(atr),
            _ => atr,
        };
        let objective = match bias {
            Side::Long => levels.orh().or(reference_px).map(|h| h + 0.5 * measured_move),
            Side::Short => levels.orl().map(|l| l - 0.5 * measured_move),
        };
        let structural_rr = objective
            .map(|o| ((o - price) * sign / risk_per_share).clamp(0.0, pc.rr_clip_max))
            .filter(|v| v.is_finite())
            .map(round2);

        let confidence = plan_confidence(price, features.vwap, reference_px.or(key_level));

        let plan = Plan {
            symbol: symbol.to_string(),
            bias,
            regime,
            strategy: pick.strategy,
            reference_price: round2(price),
            entry_zone,
            hard_stop: round2(hard_stop),
            structure_stop: round2(structure_stop),
            targets: vec![
                Target {
                    name: "T1".to_string(),
                    level: round2(t1),
                    rr: pc.t1_rr,
                    action: pc.t1_action.clone(),
                },
                Target {
                    name: "T2".to_string(),
                    level: round2(t2),
                    rr: pc.t2_rr,
                    action: "trail_rest".to_string(),
                },
            ],
            trail: pc.trail_to,
            risk_per_share,
            qty,
            qty_scale: penalty.qty_scale,
            t1_book_fraction: parse_book_fraction(&pc.t1_action),
            key_level: key_level.unwrap_or(f64::NAN),
            atr,
            atr_fallback,
            confidence,
            quality: PlanQuality {
                structural_rr,
                acceptance_ok: acc.ok(),
                retest_ok: acc.retest_ok,
                hold_ok: acc.hold_ok,
            },
            cautions: penalty.cautions,
        };

        if let Err(violation) = validate_plan(&plan) {
            warn!(symbol, %violation, "plan ordering violated, dropping");
            return PlanOutcome::NoSetup(NoSetupReason::InvalidLevels);
        }
        debug!(
            symbol,
            strategy = %plan.strategy,
            bias = %plan.bias,
            zone = %plan.entry_zone,
            stop = plan.hard_stop,
            t1 = plan.t1(),
            qty = plan.qty,
            "plan ready"
        );
        PlanOutcome::Plan(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ist_datetime, Candle};
    use chrono::{Duration, NaiveDate, NaiveTime};

    /// Steady climb from 100 with small ranges, `n` bars from 09:15.
    fn climbing_session(n: usize) -> Vec<Candle> {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let open = NaiveTime::from_hms_opt(9, 15, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + 0.2 * i as f64;
                Candle {
                    timestamp: ist_datetime(date, open + Duration::minutes(5 * i as i64)),
                    open: close - 0.1,
                    high: close + 0.15,
                    low: close - 0.25,
                    close,
                    volume: 1000,
                }
            })
            .collect()
    }

    fn snapshot(candles: &[Candle], cfg: &AppConfig) -> SessionSnapshot {
        let tick = candles.last().unwrap().timestamp;
        SessionSnapshot::build("INFY", candles, tick, cfg)
    }

    #[test]
    fn long_plan_is_ordered_and_sized() {
        let cfg = AppConfig::default();
        let candles = climbing_session(40);
        let snap = snapshot(&candles, &cfg);
        let levels = SessionLevels::extract(&snap.candles, None, cfg.engine.market_open, 15);
        let plan = TradePlanner::new(&cfg)
            .plan(&snap, &levels, None)
            .plan()
            .expect("climbing session should plan");
        assert_eq!(plan.bias, Side::Long);
        assert!(validate_plan(&plan).is_ok());
        assert!(plan.qty > 0);
        let rr1 = (plan.t1() - plan.reference_price) / plan.risk_per_share;
        assert!((rr1 - cfg.planner.t1_rr).abs() < 0.01, "rr1 {rr1}");
        assert!((plan.t1_book_fraction - 0.30).abs() < 1e-12);
        assert!(plan.quality.structural_rr.is_some());
    }

    #[test]
    fn hard_stop_is_wider_of_structure_and_atr() {
        let cfg = AppConfig::default();
        let candles = climbing_session(40);
        let snap = snapshot(&candles, &cfg);
        let levels = SessionLevels::extract(&snap.candles, None, cfg.engine.market_open, 15);
        let plan = TradePlanner::new(&cfg).plan(&snap, &levels, None).plan().unwrap();
        let atr_stop = plan.reference_price - cfg.planner.sl_atr_mult * plan.atr;
        assert!(plan.hard_stop <= plan.structure_stop + 1e-9);
        assert!(plan.hard_stop <= atr_stop + 0.01);
    }

    #[test]
    fn empty_session_is_no_setup() {
        let cfg = AppConfig::default();
        let snap = snapshot(&climbing_session(1), &cfg);
        let empty = SessionSnapshot {
            candles: Vec::new(),
            ..snap
        };
        let out = TradePlanner::new(&cfg).plan(&empty, &SessionLevels::default(), None);
        assert_eq!(out, PlanOutcome::NoSetup(NoSetupReason::EmptySession));
    }

    #[test]
    fn flat_session_has_no_strategy() {
        let cfg = AppConfig::default();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let open = NaiveTime::from_hms_opt(9, 15, 0).unwrap();
        let candles: Vec<Candle> = (0..30)
            .map(|i| Candle {
                timestamp: ist_datetime(date, open + Duration::minutes(5 * i)),
                open: 100.0,
                high: 100.5,
                low: 99.5,
                close: 100.0,
                volume: 1000,
            })
            .collect();
        let snap = snapshot(&candles, &cfg);
        let levels = SessionLevels::extract(&snap.candles, None, cfg.engine.market_open, 15);
        let out = TradePlanner::new(&cfg).plan(&snap, &levels, None);
        assert_eq!(out, PlanOutcome::NoSetup(NoSetupReason::NoStrategy));
    }

    #[test]
    fn confidence_bumps() {
        assert_eq!(plan_confidence(100.0, None, None), 0.6);
        assert_eq!(plan_confidence(100.0, Some(99.0), Some(99.8)), 0.9);
        assert_eq!(plan_confidence(100.0, Some(101.0), Some(99.8)), 0.75);
    }

    #[test]
    fn validate_rejects_misordered_short() {
        let cfg = AppConfig::default();
        let candles = climbing_session(40);
        let snap = snapshot(&candles, &cfg);
        let levels = SessionLevels::extract(&snap.candles, None, cfg.engine.market_open, 15);
        let mut plan = TradePlanner::new(&cfg).plan(&snap, &levels, None).plan().unwrap();
        plan.bias = Side::Short;
        assert!(validate_plan(&plan).is_err());
    }
}
