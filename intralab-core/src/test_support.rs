//! Shared builders for unit tests.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};

use crate::acceptance::Acceptance;
use crate::config::AppConfig;
use crate::domain::{ist_datetime, Candle, Side, TrailRule};
use crate::indicators::make_candles;
use crate::levels::{LevelKind, ReferenceLevel, SessionLevels};
use crate::planner::{EntryZone, Plan, PlanQuality, Regime, Strategy, Target};
use crate::screener::Candidate;
use crate::session::{IntradayFeatures, SessionSnapshot};

pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

pub fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
    ist_datetime(test_date(), NaiveTime::from_hms_opt(h, m, 0).unwrap())
}

pub fn bar_at(h: u32, m: u32, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        timestamp: at(h, m),
        open,
        high,
        low,
        close,
        volume: 1000,
    }
}

/// Long candidate over a prev-day-high `level`.
pub fn candidate(symbol: &str, level: f64, volume_ratio: f64, ma20_slope: f64) -> Candidate {
    let candles = make_candles(&[level]);
    let snapshot =
        SessionSnapshot::build(symbol, &candles, candles[0].timestamp, &AppConfig::default());
    let close = level * 1.005;
    Candidate {
        symbol: symbol.to_string(),
        daily_score: 1.0,
        bias: Side::Long,
        level: ReferenceLevel {
            kind: LevelKind::PrevDayHigh,
            price: level,
        },
        levels: SessionLevels::default(),
        features: IntradayFeatures {
            close,
            vwap: Some(level),
            volume_ratio,
            rsi: Some(60.0),
            rsi_slope: 1.0,
            adx: Some(22.0),
            adx_slope: 0.5,
            ema20: Some(level),
            ema50: Some(level * 0.99),
            ma20_slope,
            macd_hist: Some(0.02),
            above_vwap: true,
            squeeze_pctile: Some(40.0),
            atr5: 0.5,
        },
        acceptance: Acceptance {
            retest_ok: true,
            hold_ok: true,
        },
        last_close: close,
        vwap: Some(level),
        atr5: 0.5,
        dist_from_level_bpct: 0.5,
        snapshot,
    }
}

pub fn long_plan(zone: [f64; 2], stop: f64, t1: f64, t2: f64) -> Plan {
    let price = (zone[0] + zone[1]) / 2.0;
    Plan {
        symbol: "INFY".to_string(),
        bias: Side::Long,
        regime: Regime::TrendUp,
        strategy: Strategy::OrbPullbackLong,
        reference_price: price,
        entry_zone: EntryZone {
            lo: zone[0],
            hi: zone[1],
        },
        hard_stop: stop,
        structure_stop: stop,
        targets: vec![
            Target {
                name: "T1".to_string(),
                level: t1,
                rr: 1.2,
                action: "book_30%".to_string(),
            },
            Target {
                name: "T2".to_string(),
                level: t2,
                rr: 2.0,
                action: "trail_rest".to_string(),
            },
        ],
        trail: TrailRule::VwapOrEma20,
        risk_per_share: price - stop,
        qty: 500,
        qty_scale: 1.0,
        t1_book_fraction: 0.30,
        key_level: zone[0],
        atr: 1.0,
        atr_fallback: false,
        confidence: 0.75,
        quality: PlanQuality {
            structural_rr: Some(1.0),
            acceptance_ok: true,
            retest_ok: true,
            hold_ok: true,
        },
        cautions: Vec::new(),
    }
}
