//! Single-day runner: suggestions file in, day report out.
//!
//! A missing suggestions file skips the day. A malformed one fails the day
//! without touching other days. Authentication failures are the only errors
//! that escape, because they abort the whole run.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use intralab_core::config::{AppConfig, ConfigError};
use intralab_core::diagnostics::DiagnosticsRecorder;
use intralab_core::{run_day_session, CandleStore, DayReport, DaySession, EngineError};

use crate::suggestions::load_suggestions;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to read suggestions {path}: {source}")]
    SuggestionsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed suggestions file {path}: {reason}")]
    Suggestions { path: String, reason: String },

    #[error("run aborted: {0}")]
    Engine(#[from] EngineError),

    #[error("invalid date range: {from} is after {to}")]
    DateRange { from: NaiveDate, to: NaiveDate },

    #[error("failed to build worker pool: {0}")]
    Pool(String),
}

impl RunError {
    /// Whether this error must stop every other day of the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RunError::Engine(EngineError::Authentication { .. }))
    }
}

/// What happened to one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DayOutcome {
    Completed(DayReport),
    Skipped { date: NaiveDate, reason: String },
    Failed { date: NaiveDate, error: String },
}

impl DayOutcome {
    pub fn date(&self) -> NaiveDate {
        match self {
            DayOutcome::Completed(report) => report.date,
            DayOutcome::Skipped { date, .. } | DayOutcome::Failed { date, .. } => *date,
        }
    }

    pub fn report(&self) -> Option<&DayReport> {
        match self {
            DayOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Run one date into `recorder`.
pub fn run_day(
    store: &dyn CandleStore,
    suggestions_dir: &Path,
    date: NaiveDate,
    config: &AppConfig,
    recorder: &mut DiagnosticsRecorder,
) -> Result<DayOutcome, RunError> {
    let suggestions = match load_suggestions(suggestions_dir, date) {
        Ok(Some(rows)) => rows,
        Ok(None) => {
            warn!(%date, "no suggestions file, skipping day");
            return Ok(DayOutcome::Skipped {
                date,
                reason: "missing suggestions file".to_string(),
            });
        }
        Err(e) => {
            warn!(%date, error = %e, "day failed");
            return Ok(DayOutcome::Failed {
                date,
                error: e.to_string(),
            });
        }
    };

    let session = DaySession {
        date,
        store,
        suggestions: &suggestions,
        config,
    };
    let report = run_day_session(&session, recorder)?;
    info!(
        %date,
        entries = report.entries,
        exits = report.exit_events,
        no_setups = report.no_setups,
        "day complete"
    );
    Ok(DayOutcome::Completed(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use intralab_core::data::MemoryCandleStore;
    use intralab_core::domain::Suggestion;
    use intralab_core::DataError;

    use crate::suggestions::write_suggestions;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[test]
    fn missing_file_skips() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryCandleStore::new();
        let mut rec = DiagnosticsRecorder::new();
        let out = run_day(&store, dir.path(), day(), &AppConfig::default(), &mut rec).unwrap();
        assert!(matches!(out, DayOutcome::Skipped { .. }));
        assert_eq!(out.date(), day());
        assert!(out.report().is_none());
    }

    #[test]
    fn malformed_file_fails_only_the_day() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("suggestions_all_2024-03-04.json"), "{oops").unwrap();
        let store = MemoryCandleStore::new();
        let mut rec = DiagnosticsRecorder::new();
        let out = run_day(&store, dir.path(), day(), &AppConfig::default(), &mut rec).unwrap();
        match out {
            DayOutcome::Failed { date, error } => {
                assert_eq!(date, day());
                assert!(error.contains("malformed"), "{error}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn symbols_without_data_complete_with_no_trades() {
        let dir = tempfile::tempdir().unwrap();
        write_suggestions(dir.path(), day(), &[Suggestion::new("INFY", 1.0)]).unwrap();
        let store = MemoryCandleStore::new();
        let mut rec = DiagnosticsRecorder::new();
        let out = run_day(&store, dir.path(), day(), &AppConfig::default(), &mut rec).unwrap();
        let report = out.report().unwrap();
        assert_eq!(report.entries, 0);
        assert!(report.gate_stats.fetch_skip > 0);
        assert!(rec.is_empty());
    }

    #[test]
    fn only_authentication_is_fatal() {
        let auth = RunError::Engine(EngineError::Authentication {
            date: day(),
            source: DataError::AuthenticationFailed("token expired".into()),
        });
        assert!(auth.is_fatal());
        assert!(!RunError::Pool("x".into()).is_fatal());
    }
}
