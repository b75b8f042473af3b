//! CSV-backed candle store.
//!
//! Layout: `<root>/<SYMBOL>/<interval>.csv` where interval is `day` or
//! `5minute`. Columns: `timestamp,open,high,low,close,volume`. Timestamps are
//! RFC 3339 with offset; daily files may use bare `YYYY-MM-DD` dates, which
//! are stamped at 00:00 IST.
//!
//! Parsed files are cached behind an `RwLock`, so concurrent day workers pay
//! the parse cost once per (symbol, interval).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::store::{slice_window, CandleStore, DataError};
use crate::domain::{ist_datetime, Candle, Interval};

#[derive(Debug, Serialize, Deserialize)]
struct CandleRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

type SeriesKey = (String, Interval);

#[derive(Debug)]
pub struct CsvCandleStore {
    root: PathBuf,
    cache: RwLock<HashMap<SeriesKey, Arc<Vec<Candle>>>>,
}

impl CsvCandleStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the CSV file for (symbol, interval).
    pub fn series_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.root
            .join(symbol)
            .join(format!("{}.csv", interval.as_str()))
    }

    fn load(&self, symbol: &str, interval: Interval) -> Result<Arc<Vec<Candle>>, DataError> {
        let key = (symbol.to_string(), interval);
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(hit));
        }

        let path = self.series_path(symbol, interval);
        if !path.exists() {
            return Err(DataError::NotFound {
                symbol: symbol.to_string(),
                interval,
            });
        }
        let candles = Arc::new(read_candles_csv(&path)?);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&candles));
        Ok(candles)
    }
}

impl CandleStore for CsvCandleStore {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    ) -> Result<Vec<Candle>, DataError> {
        let series = self.load(symbol, interval)?;
        Ok(slice_window(&series, from, to).to_vec())
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%z") {
        return Some(ts);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| ist_datetime(d, NaiveTime::MIN))
}

/// Read and validate one candle file. Rows are sorted by timestamp.
pub fn read_candles_csv(path: &Path) -> Result<Vec<Candle>, DataError> {
    let source_name = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|e| DataError::Parse {
        source_name: source_name.clone(),
        reason: e.to_string(),
    })?;

    let mut candles = Vec::new();
    for (line, record) in reader.deserialize::<CandleRecord>().enumerate() {
        let rec = record.map_err(|e| DataError::Parse {
            source_name: source_name.clone(),
            reason: e.to_string(),
        })?;
        let timestamp = parse_timestamp(&rec.timestamp).ok_or_else(|| DataError::Parse {
            source_name: source_name.clone(),
            reason: format!("row {}: bad timestamp '{}'", line + 1, rec.timestamp),
        })?;
        candles.push(Candle {
            timestamp,
            open: rec.open,
            high: rec.high,
            low: rec.low,
            close: rec.close,
            volume: rec.volume,
        });
    }
    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

/// Write candles in the store's on-disk format, creating parent directories.
pub fn write_candles_csv(path: &Path, candles: &[Candle]) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let to_parse_err = |e: csv::Error| DataError::Parse {
        source_name: path.display().to_string(),
        reason: e.to_string(),
    };
    let mut writer = csv::Writer::from_path(path).map_err(to_parse_err)?;
    for c in candles {
        writer
            .serialize(CandleRecord {
                timestamp: c.timestamp.to_rfc3339(),
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
                volume: c.volume,
            })
            .map_err(to_parse_err)?;
    }
    writer.flush()?;
    Ok(())
}
