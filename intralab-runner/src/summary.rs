//! Run-level summary metrics.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use intralab_core::screener::GateStats;

use crate::config::RunId;
use crate::parallel::RunResult;
use crate::runner::DayOutcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayFailure {
    pub date: NaiveDate,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days_run: usize,
    pub days_skipped: usize,
    pub days_failed: usize,
    pub failures: Vec<DayFailure>,
    pub trades: usize,
    /// Exit events per reason (`STOP`, `T1_PARTIAL`, ...).
    pub exits_by_reason: BTreeMap<String, usize>,
    pub winners: usize,
    pub losers: usize,
    /// Share of closed trades with positive realized PnL; `None` without trades.
    pub win_rate: Option<f64>,
    pub total_pnl: f64,
    pub gate_stats: GateStats,
}

impl RunSummary {
    pub fn from_result(result: &RunResult) -> Self {
        let mut days_run = 0;
        let mut days_skipped = 0;
        let mut failures = Vec::new();
        for outcome in &result.outcomes {
            match outcome {
                DayOutcome::Completed(_) => days_run += 1,
                DayOutcome::Skipped { .. } => days_skipped += 1,
                DayOutcome::Failed { date, error } => failures.push(DayFailure {
                    date: *date,
                    error: error.clone(),
                }),
            }
        }

        let mut exits_by_reason = BTreeMap::new();
        for exit in result.diagnostics.exits() {
            *exits_by_reason.entry(exit.reason.as_str().to_string()).or_insert(0) += 1;
        }

        let closed: Vec<f64> = result
            .diagnostics
            .rows()
            .filter(|r| r.is_closed())
            .map(|r| r.realized_pnl)
            .collect();
        let winners = closed.iter().filter(|p| **p > 0.0).count();
        let losers = closed.iter().filter(|p| **p < 0.0).count();
        let win_rate = if closed.is_empty() {
            None
        } else {
            Some(winners as f64 / closed.len() as f64)
        };
        let total_pnl = result.diagnostics.rows().map(|r| r.realized_pnl).sum();

        Self {
            run_id: result.run_id.clone(),
            from: result.from,
            to: result.to,
            days_run,
            days_skipped,
            days_failed: failures.len(),
            failures,
            trades: result.diagnostics.len(),
            exits_by_reason,
            winners,
            losers,
            win_rate,
            total_pnl,
            gate_stats: result.gate_stats(),
        }
    }
}
