//! Candle-pattern tag for the last bar of a series.
//!
//! Three-bar patterns are checked first, then two-bar, then single-bar, so
//! the most specific formation wins. Hammer and hanging man share a shape;
//! the preceding move decides which label applies.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandlePattern {
    BullishEngulfing,
    BearishEngulfing,
    Hammer,
    ShootingStar,
    MorningStar,
    EveningStar,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
    Piercing,
    DarkCloudCover,
    HangingMan,
}

impl CandlePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandlePattern::BullishEngulfing => "bullish_engulfing",
            CandlePattern::BearishEngulfing => "bearish_engulfing",
            CandlePattern::Hammer => "hammer",
            CandlePattern::ShootingStar => "shooting_star",
            CandlePattern::MorningStar => "morning_star",
            CandlePattern::EveningStar => "evening_star",
            CandlePattern::ThreeWhiteSoldiers => "three_white_soldiers",
            CandlePattern::ThreeBlackCrows => "three_black_crows",
            CandlePattern::Piercing => "piercing",
            CandlePattern::DarkCloudCover => "dark_cloud_cover",
            CandlePattern::HangingMan => "hanging_man",
        }
    }

    /// Pattern firing on the last candle, if any.
    pub fn detect(candles: &[Candle]) -> Option<CandlePattern> {
        let n = candles.len();
        let last = candles.last()?;
        if last.is_void() {
            return None;
        }

        if n >= 3 {
            let (a, b, c) = (&candles[n - 3], &candles[n - 2], last);
            if is_morning_star(a, b, c) {
                return Some(CandlePattern::MorningStar);
            }
            if is_evening_star(a, b, c) {
                return Some(CandlePattern::EveningStar);
            }
            if [a, b, c].iter().all(|k| is_green(k))
                && b.close > a.close
                && c.close > b.close
                && b.open > a.open
                && c.open > b.open
            {
                return Some(CandlePattern::ThreeWhiteSoldiers);
            }
            if [a, b, c].iter().all(|k| is_red(k))
                && b.close < a.close
                && c.close < b.close
                && b.open < a.open
                && c.open < b.open
            {
                return Some(CandlePattern::ThreeBlackCrows);
            }
        }

        if n >= 2 {
            let prev = &candles[n - 2];
            if is_red(prev) && is_green(last) && last.close > prev.open && last.open < prev.close {
                return Some(CandlePattern::BullishEngulfing);
            }
            if is_green(prev) && is_red(last) && last.close < prev.open && last.open > prev.close {
                return Some(CandlePattern::BearishEngulfing);
            }
            let prev_mid = (prev.open + prev.close) / 2.0;
            if is_red(prev)
                && is_green(last)
                && last.open < prev.low
                && last.close > prev_mid
                && last.close < prev.open
            {
                return Some(CandlePattern::Piercing);
            }
            if is_green(prev)
                && is_red(last)
                && last.open > prev.high
                && last.close < prev_mid
                && last.close > prev.open
            {
                return Some(CandlePattern::DarkCloudCover);
            }
        }

        if is_hammer_shape(last) {
            let rising_into = n >= 3 && candles[n - 2].close > candles[n - 3].close;
            return Some(if rising_into {
                CandlePattern::HangingMan
            } else {
                CandlePattern::Hammer
            });
        }
        if is_shooting_star(last) {
            return Some(CandlePattern::ShootingStar);
        }
        None
    }
}

impl fmt::Display for CandlePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn body(c: &Candle) -> f64 {
    (c.close - c.open).abs()
}

fn is_green(c: &Candle) -> bool {
    c.close > c.open
}

fn is_red(c: &Candle) -> bool {
    c.close < c.open
}

// Lower shadow measured from the top of the body.
fn is_hammer_shape(c: &Candle) -> bool {
    let b = body(c);
    let lower = c.open.max(c.close) - c.low;
    let upper = c.high - c.open.max(c.close);
    b > 0.0 && lower > 2.0 * b && upper < b
}

fn is_shooting_star(c: &Candle) -> bool {
    let b = body(c);
    let upper = c.high - c.open.max(c.close);
    let lower = c.open.min(c.close) - c.low;
    b > 0.0 && upper > 2.0 * b && lower < b
}

fn is_small_body(c: &Candle, reference: &Candle) -> bool {
    body(c) < 0.3 * body(reference)
}

fn is_morning_star(a: &Candle, b: &Candle, c: &Candle) -> bool {
    is_red(a)
        && is_small_body(b, a)
        && b.open.max(b.close) < a.close
        && is_green(c)
        && c.close > (a.open + a.close) / 2.0
}

fn is_evening_star(a: &Candle, b: &Candle, c: &Candle) -> bool {
    is_green(a)
        && is_small_body(b, a)
        && b.open.min(b.close) > a.close
        && is_red(c)
        && c.close < (a.open + a.close) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    fn bar(template: &Candle, o: f64, h: f64, l: f64, c: f64) -> Candle {
        Candle {
            open: o,
            high: h,
            low: l,
            close: c,
            ..template.clone()
        }
    }

    #[test]
    fn bullish_engulfing_on_last_bar() {
        let t = make_candles(&[100.0, 100.0]);
        let candles = vec![
            bar(&t[0], 101.0, 101.5, 99.5, 100.0),
            bar(&t[1], 99.8, 102.0, 99.5, 101.5),
        ];
        assert_eq!(CandlePattern::detect(&candles), Some(CandlePattern::BullishEngulfing));
    }

    #[test]
    fn bearish_engulfing_on_last_bar() {
        let t = make_candles(&[100.0, 100.0]);
        let candles = vec![
            bar(&t[0], 100.0, 101.5, 99.5, 101.0),
            bar(&t[1], 101.2, 101.5, 99.0, 99.5),
        ];
        assert_eq!(CandlePattern::detect(&candles), Some(CandlePattern::BearishEngulfing));
    }

    #[test]
    fn hammer_vs_hanging_man() {
        let t = make_candles(&[100.0, 100.0, 100.0]);
        let hammer = bar(&t[2], 100.0, 100.6, 97.0, 100.5);
        let falling = vec![
            bar(&t[0], 103.0, 103.5, 101.5, 102.0),
            bar(&t[1], 102.0, 102.2, 100.5, 101.0),
            hammer.clone(),
        ];
        assert_eq!(CandlePattern::detect(&falling), Some(CandlePattern::Hammer));

        let rising = vec![
            bar(&t[0], 98.0, 99.5, 97.5, 99.0),
            bar(&t[1], 99.0, 101.2, 98.8, 101.0),
            hammer,
        ];
        assert_eq!(CandlePattern::detect(&rising), Some(CandlePattern::HangingMan));
    }

    #[test]
    fn three_white_soldiers() {
        let t = make_candles(&[100.0, 100.0, 100.0]);
        let candles = vec![
            bar(&t[0], 100.0, 101.2, 99.8, 101.0),
            bar(&t[1], 100.8, 102.2, 100.6, 102.0),
            bar(&t[2], 101.8, 103.2, 101.6, 103.0),
        ];
        assert_eq!(CandlePattern::detect(&candles), Some(CandlePattern::ThreeWhiteSoldiers));
    }

    #[test]
    fn plain_bar_has_no_pattern() {
        let t = make_candles(&[100.0]);
        let candles = vec![bar(&t[0], 100.0, 100.6, 99.9, 100.5)];
        assert_eq!(CandlePattern::detect(&candles), None);
        assert_eq!(CandlePattern::detect(&[]), None);
    }
}
