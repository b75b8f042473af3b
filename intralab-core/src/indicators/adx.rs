//! ADX: Average Directional Index with its +DI / -DI lines.
//!
//! Steps:
//! 1. +DM / -DM from consecutive highs and lows (0 on the first bar)
//! 2. TR smoothed with Wilder EWM (alpha = 1/period, min_periods = period)
//! 3. ±DI = 100 * EWM(±DM) / smoothed TR
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI), 0 where undefined
//! 5. ADX = Wilder EWM of DX (min_periods = period)
//!
//! Lookback: period - 1.

use super::atr::true_range;
use super::{ewm, Indicator};
use crate::domain::Candle;

/// Which line of the directional system an [`Adx`] instance emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdxLine {
    Adx,
    PlusDi,
    MinusDi,
}

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    line: AdxLine,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        Self::line(period, AdxLine::Adx)
    }

    pub fn line(period: usize, line: AdxLine) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        let prefix = match line {
            AdxLine::Adx => "adx",
            AdxLine::PlusDi => "plus_di",
            AdxLine::MinusDi => "minus_di",
        };
        Self {
            period,
            line,
            name: format!("{prefix}_{period}"),
        }
    }
}

/// Full directional system: (adx, +di, -di).
pub fn directional_system(candles: &[Candle], period: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let n = candles.len();
    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let up = candles[i].high - candles[i - 1].high;
        let down = candles[i - 1].low - candles[i].low;
        if up.is_nan() || down.is_nan() {
            plus_dm[i] = f64::NAN;
            minus_dm[i] = f64::NAN;
            continue;
        }
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
    }

    let alpha = 1.0 / period as f64;
    let atr = ewm(&true_range(candles), alpha, period);
    let smooth_plus = ewm(&plus_dm, alpha, 1);
    let smooth_minus = ewm(&minus_dm, alpha, 1);

    let plus_di: Vec<f64> = smooth_plus
        .iter()
        .zip(&atr)
        .map(|(&dm, &tr)| 100.0 * dm / tr)
        .collect();
    let minus_di: Vec<f64> = smooth_minus
        .iter()
        .zip(&atr)
        .map(|(&dm, &tr)| 100.0 * dm / tr)
        .collect();

    let dx: Vec<f64> = plus_di
        .iter()
        .zip(&minus_di)
        .map(|(&p, &m)| {
            let v = 100.0 * (p - m).abs() / (p + m);
            if v.is_finite() {
                v
            } else {
                0.0
            }
        })
        .collect();
    let adx = ewm(&dx, alpha, period);

    let clean = |v: Vec<f64>| -> Vec<f64> {
        v.into_iter()
            .map(|x| if x.is_finite() { x } else { f64::NAN })
            .collect()
    };
    (adx, clean(plus_di), clean(minus_di))
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let (adx, plus_di, minus_di) = directional_system(candles, self.period);
        match self.line {
            AdxLine::Adx => adx,
            AdxLine::PlusDi => plus_di,
            AdxLine::MinusDi => minus_di,
        }
    }
}
