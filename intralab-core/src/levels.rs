//! Level extractor: reference levels per symbol per tick.
//!
//! Priority for the breakout reference is the prior session's high, then the
//! 15-minute opening-range high. Opening-range low and swing pivots feed the
//! short side and stop placement.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    PrevDayHigh,
    #[serde(rename = "orb_high_15m")]
    OrbHigh15m,
    SwingLow,
    SwingHigh,
}

impl LevelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LevelKind::PrevDayHigh => "prev_day_high",
            LevelKind::OrbHigh15m => "orb_high_15m",
            LevelKind::SwingLow => "swing_low",
            LevelKind::SwingHigh => "swing_high",
        }
    }
}

impl fmt::Display for LevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLevel {
    pub kind: LevelKind,
    pub price: f64,
}

/// Prior session's daily bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrevDay {
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PrevDay {
    pub fn from_candle(c: &Candle) -> Self {
        Self {
            high: c.high,
            low: c.low,
            close: c.close,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpeningRange {
    pub high: f64,
    pub low: f64,
}

/// Extremes of the bars stamped within `[open, open + minutes]`.
pub fn opening_range(candles: &[Candle], open: NaiveTime, minutes: i64) -> Option<OpeningRange> {
    let end = open + Duration::minutes(minutes);
    let mut window = candles.iter().filter(|c| {
        let t = c.session_time();
        t >= open && t <= end && !c.is_void()
    });
    let first = window.next()?;
    let (high, low) = window.fold((first.high, first.low), |(h, l), c| (h.max(c.high), l.min(c.low)));
    Some(OpeningRange { high, low })
}

/// Lowest low of the last `lookback + 2` bars.
pub fn swing_low(candles: &[Candle], lookback: usize) -> Option<f64> {
    let start = candles.len().saturating_sub(lookback + 2);
    candles[start..]
        .iter()
        .map(|c| c.low)
        .filter(|v| v.is_finite())
        .reduce(f64::min)
}

/// Highest high of the last `lookback + 2` bars.
pub fn swing_high(candles: &[Candle], lookback: usize) -> Option<f64> {
    let start = candles.len().saturating_sub(lookback + 2);
    candles[start..]
        .iter()
        .map(|c| c.high)
        .filter(|v| v.is_finite())
        .reduce(f64::max)
}

/// Levels available for one symbol at one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionLevels {
    pub prev_day: Option<PrevDay>,
    pub opening_range: Option<OpeningRange>,
}

impl SessionLevels {
    pub fn extract(
        session: &[Candle],
        prev_day: Option<&Candle>,
        market_open: NaiveTime,
        opening_range_min: i64,
    ) -> Self {
        Self {
            prev_day: prev_day.filter(|c| !c.is_void()).map(PrevDay::from_candle),
            opening_range: opening_range(session, market_open, opening_range_min),
        }
    }

    pub fn orh(&self) -> Option<f64> {
        self.opening_range.map(|r| r.high)
    }

    pub fn orl(&self) -> Option<f64> {
        self.opening_range.map(|r| r.low)
    }

    pub fn pdh(&self) -> Option<f64> {
        self.prev_day.map(|p| p.high).filter(|v| v.is_finite())
    }

    pub fn pdl(&self) -> Option<f64> {
        self.prev_day.map(|p| p.low).filter(|v| v.is_finite())
    }

    /// Breakout reference: prior-day high, else opening-range high.
    pub fn resolve_reference(&self) -> Option<ReferenceLevel> {
        if let Some(price) = self.pdh() {
            return Some(ReferenceLevel {
                kind: LevelKind::PrevDayHigh,
                price,
            });
        }
        self.orh().filter(|v| v.is_finite()).map(|price| ReferenceLevel {
            kind: LevelKind::OrbHigh15m,
            price,
        })
    }
}

/// Percentage distance of `price` above `level` (negative below).
pub fn distance_bpct(level: f64, price: f64) -> Option<f64> {
    if level == 0.0 || !level.is_finite() || !price.is_finite() {
        return None;
    }
    Some((price / level - 1.0) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn opening_range_covers_first_fifteen_minutes() {
        // bars at 09:15, 09:20, 09:25, 09:30, 09:35
        let candles = make_candles(&[100.0, 101.0, 102.0, 103.0, 110.0]);
        let or = opening_range(&candles, t(9, 15), 15).unwrap();
        assert_eq!(or.high, 104.0);
        assert_eq!(or.low, 99.0);
    }

    #[test]
    fn opening_range_empty_window() {
        let candles = make_candles(&[100.0]);
        assert!(opening_range(&candles, t(10, 0), 15).is_none());
    }

    #[test]
    fn swing_pivots_use_lookback_plus_two() {
        let candles = make_candles(&[90.0, 100.0, 101.0, 102.0]);
        // last 2 bars span 99..103
        assert_eq!(swing_low(&candles, 0), Some(99.0));
        assert_eq!(swing_high(&candles, 0), Some(103.0));
        assert_eq!(swing_low(&candles, 10), Some(89.0));
        assert_eq!(swing_low(&[], 10), None);
    }

    #[test]
    fn reference_prefers_prev_day_high() {
        let session = make_candles(&[100.0, 101.0, 102.0]);
        let mut daily = make_candles(&[99.0])[0].clone();
        daily.high = 100.5;
        let levels = SessionLevels::extract(&session, Some(&daily), t(9, 15), 15);
        let r = levels.resolve_reference().unwrap();
        assert_eq!(r.kind, LevelKind::PrevDayHigh);
        assert_eq!(r.price, 100.5);

        let levels = SessionLevels::extract(&session, None, t(9, 15), 15);
        let r = levels.resolve_reference().unwrap();
        assert_eq!(r.kind, LevelKind::OrbHigh15m);
        assert_eq!(r.price, 103.0);
    }

    #[test]
    fn no_level_without_inputs() {
        let levels = SessionLevels::extract(&[], None, t(9, 15), 15);
        assert!(levels.resolve_reference().is_none());
    }

    #[test]
    fn distance_is_signed_percent() {
        assert!((distance_bpct(100.0, 101.0).unwrap() - 1.0).abs() < 1e-9);
        assert!(distance_bpct(0.0, 101.0).is_none());
    }
}
