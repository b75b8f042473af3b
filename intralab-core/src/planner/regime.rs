//! Session regime from choppiness and the EMA20/EMA50 stack.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PlannerConfig;

/// Bars spanned by the EMA20 slope.
pub const SLOPE_BARS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    TrendUp,
    TrendDown,
    Range,
    Choppy,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::TrendUp => "trend_up",
            Regime::TrendDown => "trend_down",
            Regime::Range => "range",
            Regime::Choppy => "choppy",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative EMA20 change over the last five bars; 0 with fewer bars.
pub fn ema20_slope(ema20: &[f64]) -> f64 {
    let n = ema20.len();
    if n < SLOPE_BARS {
        return 0.0;
    }
    let now = ema20[n - 1];
    let then = ema20[n - SLOPE_BARS];
    if !now.is_finite() || !then.is_finite() {
        return 0.0;
    }
    (now - then) / then.abs().max(1e-9)
}

/// Missing choppiness counts as fully choppy.
pub fn classify(chop: Option<f64>, ema20: &[f64], ema50: &[f64], cfg: &PlannerConfig) -> Regime {
    let chop = chop.unwrap_or(100.0);
    let (Some(&e20), Some(&e50)) = (ema20.last(), ema50.last()) else {
        return Regime::Choppy;
    };
    let slope = ema20_slope(ema20);
    if chop <= cfg.chop_low && e20 > e50 && slope > 0.0 {
        Regime::TrendUp
    } else if chop <= cfg.chop_low && e20 < e50 && slope < 0.0 {
        Regime::TrendDown
    } else if chop >= cfg.chop_high {
        Regime::Choppy
    } else {
        Regime::Range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trending_stack_is_trend_up() {
        let cfg = PlannerConfig::default();
        let e20 = [100.0, 101.0, 102.0, 103.0, 104.0];
        let e50 = [100.0; 5];
        assert_eq!(classify(Some(30.0), &e20, &e50, &cfg), Regime::TrendUp);
        let e20_down = [104.0, 103.0, 102.0, 101.0, 99.0];
        assert_eq!(classify(Some(30.0), &e20_down, &e50, &cfg), Regime::TrendDown);
    }

    #[test]
    fn chop_bands() {
        let cfg = PlannerConfig::default();
        let flat = [100.0; 5];
        assert_eq!(classify(Some(70.0), &flat, &flat, &cfg), Regime::Choppy);
        assert_eq!(classify(Some(50.0), &flat, &flat, &cfg), Regime::Range);
        assert_eq!(classify(None, &flat, &flat, &cfg), Regime::Choppy);
    }

    #[test]
    fn slope_needs_five_bars() {
        assert_eq!(ema20_slope(&[1.0, 2.0, 3.0, 4.0]), 0.0);
        assert!((ema20_slope(&[100.0, 0.0, 0.0, 0.0, 110.0]) - 0.1).abs() < 1e-12);
    }
}
