//! Session snapshot: one symbol's bars for the current trading day up to a
//! tick, annotated with every indicator column.
//!
//! The snapshot is the only view of market data the screener and planner
//! see. It is built exclusively from bars stamped at or before the tick, so
//! nothing downstream can observe the future.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AppConfig;
use crate::domain::{ist, Candle};
use crate::indicators::bollinger::percentile_rank_last;
use crate::indicators::fibonacci::FIB_WINDOW;
use crate::indicators::{
    slope_series, Adx, AdxLine, Atr, Bollinger, BollingerLine, CandlePattern, Choppiness, Ema,
    FibLevels, Indicator, IndicatorValues, Macd, MacdLine, Obv, RangeAtr, Rsi, Stochastic,
    StochasticLine, VolumeRatio, Vwap,
};

/// Column names shared by the snapshot, screener, planner and engine.
pub mod cols {
    pub const EMA20: &str = "ema_20";
    pub const EMA50: &str = "ema_50";
    pub const RSI: &str = "rsi_14";
    pub const ADX: &str = "adx_14";
    pub const PLUS_DI: &str = "plus_di_14";
    pub const MINUS_DI: &str = "minus_di_14";
    pub const MACD: &str = "macd";
    pub const MACD_SIGNAL: &str = "macd_signal";
    pub const MACD_HIST: &str = "macd_hist";
    pub const BB_PCTB: &str = "bb_pctb";
    pub const BB_WIDTH: &str = "bb_width";
    pub const ATR: &str = "atr";
    pub const ATR5: &str = "atr5";
    pub const VWAP: &str = "vwap";
    pub const OBV: &str = "obv";
    pub const STOCH_K: &str = "stoch_k";
    pub const STOCH_D: &str = "stoch_d";
    pub const CHOP: &str = "chop";
    pub const VOLUME_RATIO: &str = "volume_ratio";
    pub const RSI_SLOPE: &str = "rsi_slope";
    pub const ADX_SLOPE: &str = "adx_slope";
    pub const MA20_SLOPE: &str = "ma20_slope";
}

const RSI_PERIOD: usize = 14;
const ADX_PERIOD: usize = 14;
const VOLUME_WINDOW: usize = 20;

#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub symbol: String,
    pub tick: DateTime<FixedOffset>,
    /// Current-day 5-minute bars with `timestamp <= tick`, ascending.
    pub candles: Vec<Candle>,
    pub values: IndicatorValues,
    /// Indicators whose value on the last bar is missing.
    pub missing_indicators: Vec<String>,
    pub pattern: Option<CandlePattern>,
    pub fib: Option<FibLevels>,
}

impl SessionSnapshot {
    /// Build from any fetched window; bars from other days or after the tick
    /// are discarded first.
    pub fn build(
        symbol: &str,
        fetched: &[Candle],
        tick: DateTime<FixedOffset>,
        config: &AppConfig,
    ) -> Self {
        let day = tick.with_timezone(&ist()).date_naive();
        let candles: Vec<Candle> = fetched
            .iter()
            .filter(|c| c.timestamp <= tick && c.session_date() == day)
            .cloned()
            .collect();

        let planner = &config.planner;
        let indicators = vec![
            column(cols::EMA20, Ema::new(20)),
            column(cols::EMA50, Ema::new(50)),
            column(cols::RSI, Rsi::new(RSI_PERIOD)),
            column(cols::ADX, Adx::new(ADX_PERIOD)),
            column(cols::PLUS_DI, Adx::line(ADX_PERIOD, AdxLine::PlusDi)),
            column(cols::MINUS_DI, Adx::line(ADX_PERIOD, AdxLine::MinusDi)),
            column(cols::MACD, Macd::standard(MacdLine::Line)),
            column(cols::MACD_SIGNAL, Macd::standard(MacdLine::Signal)),
            column(cols::MACD_HIST, Macd::standard(MacdLine::Hist)),
            column(cols::BB_PCTB, Bollinger::new(20, 2.0, BollingerLine::PercentB)),
            column(cols::BB_WIDTH, Bollinger::new(20, 2.0, BollingerLine::Bandwidth)),
            column(cols::ATR, Atr::new(planner.atr_period.max(1))),
            column(cols::ATR5, RangeAtr::new(5)),
            column(cols::VWAP, Vwap::new()),
            column(cols::OBV, Obv::new()),
            column(cols::STOCH_K, Stochastic::new(14, 3, 3, StochasticLine::K)),
            column(cols::STOCH_D, Stochastic::new(14, 3, 3, StochasticLine::D)),
            column(cols::CHOP, Choppiness::new(planner.choppiness_lookback.max(2))),
            column(cols::VOLUME_RATIO, VolumeRatio::new(VOLUME_WINDOW)),
        ];

        let mut values = IndicatorValues::new();
        for (name, indicator) in &indicators {
            values.insert(*name, indicator.compute(&candles));
        }

        // Slopes of already-computed columns.
        for (src, dst) in [
            (cols::RSI, cols::RSI_SLOPE),
            (cols::ADX, cols::ADX_SLOPE),
            (cols::EMA20, cols::MA20_SLOPE),
        ] {
            let series = values.get_series(src).map(slope_series).unwrap_or_default();
            values.insert(dst, series);
        }

        let mut missing_indicators: Vec<String> = indicators
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| values.last(name).is_none())
            .map(str::to_string)
            .collect();

        let fib = FibLevels::from_candles(&candles, FIB_WINDOW);
        if fib.is_none() {
            missing_indicators.push("fibonacci".to_string());
        }
        let pattern = CandlePattern::detect(&candles);

        if !missing_indicators.is_empty() {
            debug!(
                symbol,
                tick = %tick,
                bars = candles.len(),
                missing = ?missing_indicators,
                "snapshot has missing indicators"
            );
        }

        Self {
            symbol: symbol.to_string(),
            tick,
            candles,
            values,
            missing_indicators,
            pattern,
            fib,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last_bar(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Last value of a column, `None` when missing.
    pub fn last(&self, column: &str) -> Option<f64> {
        self.values.last(column)
    }

    pub fn series(&self, column: &str) -> &[f64] {
        self.values.get_series(column).unwrap_or(&[])
    }

    /// Percentile (0–100) of the current Bollinger bandwidth within the session.
    pub fn squeeze_pctile(&self) -> Option<f64> {
        percentile_rank_last(self.series(cols::BB_WIDTH))
    }

    /// Scalar features of the last bar, as consumed by the screener and ranker.
    pub fn features(&self) -> Option<IntradayFeatures> {
        let last = self.last_bar()?;
        let vwap = self.last(cols::VWAP);
        Some(IntradayFeatures {
            close: last.close,
            vwap,
            volume_ratio: self.last(cols::VOLUME_RATIO).unwrap_or(0.0),
            rsi: self.last(cols::RSI),
            rsi_slope: self.last(cols::RSI_SLOPE).unwrap_or(0.0),
            adx: self.last(cols::ADX),
            adx_slope: self.last(cols::ADX_SLOPE).unwrap_or(0.0),
            ema20: self.last(cols::EMA20),
            ema50: self.last(cols::EMA50),
            ma20_slope: self.last(cols::MA20_SLOPE).unwrap_or(0.0),
            macd_hist: self.last(cols::MACD_HIST),
            above_vwap: vwap.is_some_and(|v| last.close > v),
            squeeze_pctile: self.squeeze_pctile(),
            atr5: self.last(cols::ATR5).unwrap_or(0.0),
        })
    }
}

fn column(name: &'static str, indicator: impl Indicator + 'static) -> (&'static str, Box<dyn Indicator>) {
    (name, Box::new(indicator))
}

/// Last-bar features of a session snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntradayFeatures {
    pub close: f64,
    pub vwap: Option<f64>,
    pub volume_ratio: f64,
    pub rsi: Option<f64>,
    pub rsi_slope: f64,
    pub adx: Option<f64>,
    pub adx_slope: f64,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ma20_slope: f64,
    pub macd_hist: Option<f64>,
    pub above_vwap: bool,
    pub squeeze_pctile: Option<f64>,
    pub atr5: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    #[test]
    fn snapshot_drops_future_and_other_days() {
        let mut candles = make_candles(&[100.0, 101.0, 102.0, 103.0]);
        let tick = candles[2].timestamp;
        candles[0].timestamp -= chrono::Duration::days(1);
        let snap = SessionSnapshot::build("INFY", &candles, tick, &AppConfig::default());
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.last_bar().map(|c| c.close), Some(102.0));
    }

    #[test]
    fn short_session_reports_missing_indicators() {
        let candles = make_candles(&[100.0, 101.0, 102.0]);
        let tick = candles[2].timestamp;
        let snap = SessionSnapshot::build("INFY", &candles, tick, &AppConfig::default());
        assert!(snap.missing_indicators.contains(&cols::RSI.to_string()));
        assert!(snap.missing_indicators.contains(&cols::ADX.to_string()));
        assert!(!snap.missing_indicators.contains(&cols::VWAP.to_string()));
        assert!(!snap.missing_indicators.contains(&cols::EMA20.to_string()));
    }

    #[test]
    fn features_expose_last_bar() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + 0.5 * i as f64).collect();
        let candles = make_candles(&closes);
        let tick = candles[29].timestamp;
        let snap = SessionSnapshot::build("INFY", &candles, tick, &AppConfig::default());
        let f = snap.features().unwrap();
        assert_eq!(f.close, 114.5);
        assert!(f.rsi.is_some());
        assert!(f.adx.is_some());
        assert!(f.ma20_slope > 0.0);
        assert!(f.above_vwap);
        assert!(snap.missing_indicators.is_empty(), "{:?}", snap.missing_indicators);
    }
}
