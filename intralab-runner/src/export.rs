//! Run artifacts: diagnostics CSV, trade-event NDJSON and the JSON summary.
//!
//! File names carry the run ID so repeated runs with different configs never
//! overwrite each other.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use intralab_core::trade_log::{write_ndjson, TradeEvent};

use crate::parallel::RunResult;
use crate::summary::RunSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub diagnostics: PathBuf,
    pub events: PathBuf,
    pub summary: PathBuf,
}

impl ArtifactPaths {
    pub fn for_run(out_dir: &Path, run_id: &str) -> Self {
        Self {
            diagnostics: out_dir.join(format!("intraday_diagnostics_{run_id}.csv")),
            events: out_dir.join(format!("trade_events_{run_id}.jsonl")),
            summary: out_dir.join(format!("summary_{run_id}.json")),
        }
    }
}

/// Trade events as newline-delimited JSON.
pub fn export_events_ndjson(events: &[TradeEvent]) -> Result<String> {
    let mut buf = Vec::new();
    write_ndjson(&mut buf, events).context("failed to encode trade events")?;
    String::from_utf8(buf).context("trade events are not UTF-8")
}

pub fn export_summary_json(summary: &RunSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize run summary")
}

/// Write all three artifacts into `out_dir`, creating it if needed.
pub fn write_artifacts(result: &RunResult, out_dir: &Path) -> Result<ArtifactPaths> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output dir {}", out_dir.display()))?;
    let paths = ArtifactPaths::for_run(out_dir, &result.run_id);

    let csv = result
        .diagnostics
        .export_csv()
        .context("failed to export diagnostics")?;
    fs::write(&paths.diagnostics, csv)
        .with_context(|| format!("failed to write {}", paths.diagnostics.display()))?;

    let events = export_events_ndjson(&result.events())?;
    fs::write(&paths.events, events)
        .with_context(|| format!("failed to write {}", paths.events.display()))?;

    let summary = export_summary_json(&RunSummary::from_result(result))?;
    fs::write(&paths.summary, summary)
        .with_context(|| format!("failed to write {}", paths.summary.display()))?;

    Ok(paths)
}
