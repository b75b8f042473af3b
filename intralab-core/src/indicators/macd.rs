//! MACD (12, 26, 9): EMA difference, EMA signal and histogram.
//!
//! Built on the first-value-seeded EMA, so every line is defined from bar 0.

use super::ema::ema_of_series;
use super::{closes, Indicator};
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdLine {
    Line,
    Signal,
    Hist,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    line: MacdLine,
    name: String,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, line: MacdLine) -> Self {
        assert!(fast >= 1 && slow > fast, "MACD requires 1 <= fast < slow");
        assert!(signal >= 1, "MACD signal must be >= 1");
        let name = match line {
            MacdLine::Line => "macd".to_string(),
            MacdLine::Signal => "macd_signal".to_string(),
            MacdLine::Hist => "macd_hist".to_string(),
        };
        Self {
            fast,
            slow,
            signal,
            line,
            name,
        }
    }

    /// Standard 12/26/9 configuration.
    pub fn standard(line: MacdLine) -> Self {
        Self::new(12, 26, 9, line)
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let c = closes(candles);
        let fast = ema_of_series(&c, self.fast);
        let slow = ema_of_series(&c, self.slow);
        let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        match self.line {
            MacdLine::Line => line,
            MacdLine::Signal => ema_of_series(&line, self.signal),
            MacdLine::Hist => {
                let signal = ema_of_series(&line, self.signal);
                line.iter().zip(&signal).map(|(l, s)| l - s).collect()
            }
        }
    }
}
