//! Per-day suggestions files produced by the daily pipeline.
//!
//! Accepted shapes:
//! - `[{"symbol": "INFY", "score": 0.8}, ...]`
//! - `{"suggestions": [...]}` wrapping the same rows
//! - bare `["INFY", ...]` rows (score 0)
//!
//! Rows without a usable symbol are skipped.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

use intralab_core::domain::Suggestion;

use crate::runner::RunError;

pub fn suggestions_file_name(date: NaiveDate) -> String {
    format!("suggestions_all_{}.json", date.format("%Y-%m-%d"))
}

pub fn suggestions_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(suggestions_file_name(date))
}

/// Load the suggestions for `date`; `Ok(None)` when the file does not exist.
pub fn load_suggestions(dir: &Path, date: NaiveDate) -> Result<Option<Vec<Suggestion>>, RunError> {
    let path = suggestions_path(dir, date);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(RunError::SuggestionsIo {
                path: path.display().to_string(),
                source,
            })
        }
    };
    let rows = parse_suggestions(&raw).map_err(|reason| RunError::Suggestions {
        path: path.display().to_string(),
        reason,
    })?;
    debug!(%date, count = rows.len(), "loaded suggestions");
    Ok(Some(rows))
}

pub fn parse_suggestions(raw: &str) -> Result<Vec<Suggestion>, String> {
    let tree: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let rows = match &tree {
        Value::Array(rows) => rows,
        Value::Object(map) => match map.get("suggestions") {
            Some(Value::Array(rows)) => rows,
            _ => return Err("expected a \"suggestions\" array".to_string()),
        },
        _ => return Err("expected an array or an object".to_string()),
    };
    Ok(rows.iter().filter_map(row_to_suggestion).collect())
}

fn row_to_suggestion(row: &Value) -> Option<Suggestion> {
    let (symbol, score) = match row {
        Value::String(s) => (s.as_str(), 0.0),
        Value::Object(map) => {
            let symbol = map.get("symbol").and_then(Value::as_str)?;
            let score = map.get("score").and_then(Value::as_f64).unwrap_or(0.0);
            (symbol, score)
        }
        other => {
            warn!(row = %other, "skipping malformed suggestion row");
            return None;
        }
    };
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return None;
    }
    Some(Suggestion::new(symbol.to_uppercase(), score))
}

/// Write `rows` in the plain array shape.
pub fn write_suggestions(dir: &Path, date: NaiveDate, rows: &[Suggestion]) -> Result<PathBuf, RunError> {
    let path = suggestions_path(dir, date);
    let body = serde_json::to_string_pretty(rows).map_err(|e| RunError::Suggestions {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    std::fs::write(&path, body).map_err(|source| RunError::SuggestionsIo {
        path: path.display().to_string(),
        source,
    })?;
    Ok(path)
}
