//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime};
use intralab_core::config::AppConfig;
use intralab_core::data::MemoryCandleStore;
use intralab_core::domain::{ist_datetime, Candle, Interval, Suggestion};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn at(day: NaiveDate, h: u32, m: u32) -> DateTime<FixedOffset> {
    ist_datetime(day, hm(h, m))
}

/// Config loose enough for a steadily climbing session to pass every gate.
pub fn permissive_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.precision_screener.rsi_range = [0.0, 100.0];
    cfg.precision_screener.adx_range = [0.0, 100.0];
    cfg.precision_screener.min_vol_ratio = 0.5;
    cfg.precision_screener.max_breakout_dist_bpct = 50.0;
    cfg.intraday_gate.min_volume_ratio = 0.5;
    cfg
}

/// Full 09:15–15:25 session climbing 0.2 per bar from `start`.
pub fn rising_session(day: NaiveDate, start: f64) -> Vec<Candle> {
    (0..75)
        .map(|i| {
            let close = start + 0.2 * i as f64;
            Candle {
                timestamp: ist_datetime(day, hm(9, 15) + Duration::minutes(5 * i as i64)),
                open: close - 0.1,
                high: close + 0.15,
                low: close - 0.25,
                close,
                volume: 1000,
            }
        })
        .collect()
}

pub fn daily_bar(day: NaiveDate, high: f64) -> Candle {
    Candle {
        timestamp: ist_datetime(day, NaiveTime::MIN),
        open: high - 1.0,
        high,
        low: high - 2.0,
        close: high - 0.5,
        volume: 75_000,
    }
}

/// Rising sessions for every (symbol, day) with a prior-day high of 100.
pub fn rising_store(symbols: &[&str], days: &[NaiveDate]) -> MemoryCandleStore {
    let mut store = MemoryCandleStore::new();
    for symbol in symbols {
        for day in days {
            store.extend(symbol, Interval::FiveMinute, rising_session(*day, 100.0));
            store.extend(symbol, Interval::Day, vec![daily_bar(*day - Duration::days(1), 100.0)]);
        }
    }
    store
}

pub fn suggestions(symbols: &[&str]) -> Vec<Suggestion> {
    symbols.iter().map(|s| Suggestion::new(*s, 1.0)).collect()
}
