//! Ranker: blended daily + intraday strength.
//!
//! Each component is a capped piecewise function of one feature so a single
//! outlier cannot dominate the score.

use serde::{Deserialize, Serialize};

use crate::domain::Side;
use crate::screener::Candidate;

pub const DAILY_WEIGHT: f64 = 0.2;
pub const INTRADAY_WEIGHT: f64 = 0.8;
pub const DEFAULT_TOP_N: usize = 7;

/// Per-component breakdown of the intraday score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub vol: f64,
    pub rsi: f64,
    pub rsi_slope: f64,
    pub adx: f64,
    pub adx_slope: f64,
    pub vwap: f64,
    pub dist: f64,
    pub squeeze: f64,
    pub acceptance: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.vol
            + self.rsi
            + self.rsi_slope
            + self.adx
            + self.adx_slope
            + self.vwap
            + self.dist
            + self.squeeze
            + self.acceptance
    }
}

#[derive(Debug, Clone)]
pub struct Ranked {
    pub candidate: Candidate,
    pub breakdown: ScoreBreakdown,
    pub intraday_score: f64,
    pub rank_score: f64,
}

pub fn score(candidate: &Candidate) -> ScoreBreakdown {
    let f = &candidate.features;
    let above = match candidate.bias {
        Side::Long => f.above_vwap,
        Side::Short => f.vwap.is_some_and(|v| f.close < v),
    };
    let dist = candidate.dist_from_level_bpct.abs();
    ScoreBreakdown {
        vol: (f.volume_ratio / 2.0).min(1.2),
        rsi: ((f.rsi.unwrap_or(0.0) - 50.0) / 20.0).max(-0.5),
        rsi_slope: f.rsi_slope.clamp(0.0, 0.8),
        adx: ((f.adx.unwrap_or(0.0) - 18.0) / 20.0).max(-0.5),
        adx_slope: f.adx_slope.clamp(0.0, 0.8),
        vwap: if above { 0.3 } else { -0.3 },
        dist: if dist <= 0.6 {
            0.4
        } else if dist <= 1.0 {
            0.1
        } else {
            -0.3
        },
        squeeze: match f.squeeze_pctile {
            Some(p) if p <= 30.0 => 0.2,
            Some(p) if p <= 60.0 => 0.1,
            _ => 0.0,
        },
        acceptance: if candidate.acceptance.ok() { 0.35 } else { 0.0 },
    }
}

/// Score, sort descending by rank score (ties by symbol) and keep `top_n`.
pub fn rank(candidates: Vec<Candidate>, top_n: usize) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = candidates
        .into_iter()
        .map(|candidate| {
            let breakdown = score(&candidate);
            let intraday_score = breakdown.total();
            let rank_score = DAILY_WEIGHT * candidate.daily_score + INTRADAY_WEIGHT * intraday_score;
            Ranked {
                candidate,
                breakdown,
                intraday_score,
                rank_score,
            }
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.rank_score
            .total_cmp(&a.rank_score)
            .then_with(|| a.candidate.symbol.cmp(&b.candidate.symbol))
    });
    ranked.truncate(top_n);
    ranked
}
