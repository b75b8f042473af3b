//! In-memory candle store.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use super::store::{slice_window, CandleStore, DataError};
use crate::domain::{Candle, Interval};

/// Candle series held in memory, keyed by (symbol, interval).
#[derive(Debug, Clone, Default)]
pub struct MemoryCandleStore {
    series: HashMap<(String, Interval), Vec<Candle>>,
}

impl MemoryCandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the series for (symbol, interval). Candles are sorted by timestamp.
    pub fn insert(&mut self, symbol: impl Into<String>, interval: Interval, mut candles: Vec<Candle>) {
        candles.sort_by_key(|c| c.timestamp);
        self.series.insert((symbol.into(), interval), candles);
    }

    /// Append candles to an existing series, keeping it ordered.
    pub fn extend(&mut self, symbol: &str, interval: Interval, candles: Vec<Candle>) {
        let entry = self
            .series
            .entry((symbol.to_string(), interval))
            .or_default();
        entry.extend(candles);
        entry.sort_by_key(|c| c.timestamp);
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = self.series.keys().map(|(s, _)| s.clone()).collect();
        out.sort();
        out.dedup();
        out
    }

    pub fn series(&self, symbol: &str, interval: Interval) -> Option<&[Candle]> {
        self.series
            .get(&(symbol.to_string(), interval))
            .map(|v| v.as_slice())
    }
}

impl CandleStore for MemoryCandleStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    ) -> Result<Vec<Candle>, DataError> {
        let series = self
            .series(symbol, interval)
            .ok_or_else(|| DataError::NotFound {
                symbol: symbol.to_string(),
                interval,
            })?;
        Ok(slice_window(series, from, to).to_vec())
    }
}
