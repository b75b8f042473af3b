//! Candle: the fundamental market data unit.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::clock::ist;

/// OHLCV candle stamped with its (IST, timezone-aware) opening time.
///
/// A 5-minute candle stamped 10:00 covers 10:00–10:05 and is considered known
/// at tick 10:00. Daily candles are stamped at 00:00 IST of their session date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Candle {
    /// Trading date in IST.
    pub fn session_date(&self) -> NaiveDate {
        self.timestamp.with_timezone(&ist()).date_naive()
    }

    /// Wall-clock time in IST.
    pub fn session_time(&self) -> NaiveTime {
        self.timestamp.with_timezone(&ist()).time()
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low and the body sits inside the range.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
    }
}

/// Candle granularity served by a candle store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "day")]
    Day,
    #[serde(rename = "5minute", alias = "5m")]
    FiveMinute,
}

impl Interval {
    /// Canonical name, also used as the on-disk file stem.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Day => "day",
            Interval::FiveMinute => "5minute",
        }
    }

    /// Bar length in minutes.
    pub fn minutes(&self) -> i64 {
        match self {
            Interval::Day => 24 * 60,
            Interval::FiveMinute => 5,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown interval '{0}' (expected day, 5m or 5minute)")]
pub struct IntervalParseError(pub String);

impl FromStr for Interval {
    type Err = IntervalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "1d" => Ok(Interval::Day),
            "5m" | "5minute" | "5min" => Ok(Interval::FiveMinute),
            other => Err(IntervalParseError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ist_datetime;

    fn sample_candle() -> Candle {
        Candle {
            timestamp: ist_datetime(
                NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            ),
            open: 100.0,
            high: 102.5,
            low: 99.5,
            close: 102.0,
            volume: 12_000,
        }
    }

    #[test]
    fn candle_is_sane() {
        assert!(sample_candle().is_sane());
    }

    #[test]
    fn candle_detects_inverted_range() {
        let mut c = sample_candle();
        c.high = 99.0;
        assert!(!c.is_sane());
    }

    #[test]
    fn candle_session_fields_are_ist() {
        let c = sample_candle();
        assert_eq!(c.session_time(), NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(c.session_date(), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }

    #[test]
    fn typical_price() {
        let c = sample_candle();
        assert!((c.typical_price() - (102.5 + 99.5 + 102.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn interval_parses_aliases() {
        assert_eq!("day".parse::<Interval>().unwrap(), Interval::Day);
        assert_eq!("5m".parse::<Interval>().unwrap(), Interval::FiveMinute);
        assert_eq!("5minute".parse::<Interval>().unwrap(), Interval::FiveMinute);
        assert!("15m".parse::<Interval>().is_err());
    }
}
