//! Multi-day runner on a bounded rayon pool.
//!
//! Days share nothing but the read-only store and config. Each day records
//! into a local recorder that is folded into its worker's thread-local
//! recorder on completion; after the pool drains, every worker's recorder is
//! collected with `broadcast` and merged. An authentication failure raises a
//! shared abort flag so no further days start, and is returned to the caller.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use tracing::{error, info, warn};

use intralab_core::config::AppConfig;
use intralab_core::diagnostics::{take_thread_recorder, with_recorder, DiagnosticsRecorder};
use intralab_core::screener::GateStats;
use intralab_core::trade_log::TradeEvent;
use intralab_core::CandleStore;

use crate::config::{RunConfig, RunId};
use crate::runner::{run_day, DayOutcome, RunError};

pub const DEFAULT_WORKERS: usize = 4;

pub struct RunRequest<'a> {
    pub store: &'a dyn CandleStore,
    pub suggestions_dir: &'a Path,
    pub config: &'a AppConfig,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub workers: usize,
}

#[derive(Debug)]
pub struct RunResult {
    pub run_id: RunId,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// One outcome per calendar day, ascending.
    pub outcomes: Vec<DayOutcome>,
    pub diagnostics: DiagnosticsRecorder,
}

impl RunResult {
    /// Trade events of every completed day, in date order.
    pub fn events(&self) -> Vec<TradeEvent> {
        self.outcomes
            .iter()
            .filter_map(DayOutcome::report)
            .flat_map(|r| r.events.iter().cloned())
            .collect()
    }

    pub fn gate_stats(&self) -> GateStats {
        let mut total = GateStats::default();
        for report in self.outcomes.iter().filter_map(DayOutcome::report) {
            total.merge(&report.gate_stats);
        }
        total
    }
}

/// Every calendar day in `[from, to]`.
pub fn calendar_days(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut d = from;
    while d <= to {
        days.push(d);
        d += Duration::days(1);
    }
    days
}

pub fn run_range(request: &RunRequest<'_>) -> Result<RunResult, RunError> {
    if request.from > request.to {
        return Err(RunError::DateRange {
            from: request.from,
            to: request.to,
        });
    }
    let run_id = RunConfig::new(request.config.clone(), request.from, request.to).run_id()?;
    let days = calendar_days(request.from, request.to);
    let workers = request.workers.max(1);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("intralab-day-{i}"))
        .build()
        .map_err(|e| RunError::Pool(e.to_string()))?;

    info!(%run_id, days = days.len(), workers, "starting run");
    let abort = AtomicBool::new(false);

    let results: Vec<(NaiveDate, Result<DayOutcome, RunError>)> = pool.install(|| {
        days.par_iter()
            .map(|&date| {
                if abort.load(Ordering::Relaxed) {
                    return (
                        date,
                        Ok(DayOutcome::Skipped {
                            date,
                            reason: "run aborted".to_string(),
                        }),
                    );
                }
                let result = run_isolated(request, date);
                if matches!(&result, Err(e) if e.is_fatal()) {
                    abort.store(true, Ordering::Relaxed);
                }
                (date, result)
            })
            .collect()
    });

    let mut diagnostics = DiagnosticsRecorder::new();
    for part in pool.broadcast(|_| take_thread_recorder()) {
        diagnostics.merge(part);
    }

    let mut outcomes = Vec::with_capacity(results.len());
    for (date, result) in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) if e.is_fatal() => {
                error!(%date, error = %e, "aborting run");
                return Err(e);
            }
            Err(e) => outcomes.push(DayOutcome::Failed {
                date,
                error: e.to_string(),
            }),
        }
    }

    info!(%run_id, trades = diagnostics.len(), "run complete");
    Ok(RunResult {
        run_id,
        from: request.from,
        to: request.to,
        outcomes,
        diagnostics,
    })
}

/// Run one day, turning a panic into a failed outcome.
fn run_isolated(request: &RunRequest<'_>, date: NaiveDate) -> Result<DayOutcome, RunError> {
    let mut local = DiagnosticsRecorder::new();
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        run_day(
            request.store,
            request.suggestions_dir,
            date,
            request.config,
            &mut local,
        )
    }));
    match attempt {
        Ok(Ok(outcome)) => {
            with_recorder(|rec| rec.merge(local));
            Ok(outcome)
        }
        Ok(Err(e)) => Err(e),
        Err(payload) => {
            let error = panic_message(payload.as_ref());
            warn!(%date, %error, "day worker panicked");
            Ok(DayOutcome::Failed { date, error })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "day worker panicked".to_string()
    }
}
