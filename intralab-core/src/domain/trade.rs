//! Open trades and their exit vocabulary.
//!
//! An `OpenTrade` is created by the session loop on an accepted entry trigger
//! and mutated only by exit evaluation. Quantity bookkeeping is conservative:
//! `qty_open + qty_closed == qty_initial` holds after every mutation.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::TradeId;
use super::Candle;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("long"),
            Side::Short => f.write_str("short"),
        }
    }
}

/// Why quantity left a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    Stop,
    T1Full,
    T1Partial,
    RunnerExit,
    T2,
    Eod,
    Rebalance,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Stop => "STOP",
            ExitReason::T1Full => "T1_FULL",
            ExitReason::T1Partial => "T1_PARTIAL",
            ExitReason::RunnerExit => "RUNNER_EXIT",
            ExitReason::T2 => "T2",
            ExitReason::Eod => "EOD",
            ExitReason::Rebalance => "REBALANCE",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post-T1 trail rule carried from the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailRule {
    #[default]
    VwapOrEma20,
    None,
}

/// Entry-time features kept on the trade for the runner-hold decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeMeta {
    pub adx: Option<f64>,
    pub adx_slope: f64,
    pub rsi: Option<f64>,
    pub rsi_slope: f64,
    pub volume_ratio: f64,
    pub squeeze_pctile: Option<f64>,
    pub strategy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenTrade {
    pub trade_id: TradeId,
    pub symbol: String,
    pub side: Side,
    pub qty_initial: u64,
    pub qty_open: u64,
    pub qty_closed: u64,
    pub entry_price: f64,
    pub entry_time: DateTime<FixedOffset>,
    pub stop: f64,
    pub t1: f64,
    pub t2: Option<f64>,
    pub t1_done: bool,
    pub t1_book_fraction: f64,
    pub trail_mode: TrailRule,
    /// Timestamp of the last candle evaluated for exits.
    pub last_bar_ts: Option<DateTime<FixedOffset>>,
    pub meta: TradeMeta,
}

impl OpenTrade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trade_id: TradeId,
        symbol: impl Into<String>,
        side: Side,
        qty: u64,
        entry_price: f64,
        entry_time: DateTime<FixedOffset>,
        stop: f64,
        t1: f64,
        t2: Option<f64>,
        t1_book_fraction: f64,
    ) -> Self {
        Self {
            trade_id,
            symbol: symbol.into(),
            side,
            qty_initial: qty,
            qty_open: qty,
            qty_closed: 0,
            entry_price,
            entry_time,
            stop,
            t1,
            t2,
            t1_done: false,
            t1_book_fraction: t1_book_fraction.clamp(0.05, 0.95),
            trail_mode: TrailRule::default(),
            last_bar_ts: Some(entry_time),
            meta: TradeMeta::default(),
        }
    }

    /// Move up to `qty` from open to closed; returns the amount actually moved.
    pub fn close_qty(&mut self, qty: u64) -> u64 {
        let moved = qty.min(self.qty_open);
        self.qty_open -= moved;
        self.qty_closed += moved;
        moved
    }

    pub fn is_flat(&self) -> bool {
        self.qty_open == 0
    }

    pub fn stop_hit(&self, bar: &Candle) -> bool {
        match self.side {
            Side::Long => bar.low <= self.stop,
            Side::Short => bar.high >= self.stop,
        }
    }

    pub fn t1_hit(&self, bar: &Candle) -> bool {
        self.level_hit(bar, self.t1)
    }

    pub fn t2_hit(&self, bar: &Candle) -> bool {
        self.t2.is_some_and(|t2| self.level_hit(bar, t2))
    }

    fn level_hit(&self, bar: &Candle, level: f64) -> bool {
        match self.side {
            Side::Long => bar.high >= level,
            Side::Short => bar.low <= level,
        }
    }

    /// Signed per-share PnL of exiting at `price`.
    pub fn pnl_per_share(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.side.sign()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ist_datetime;
    use chrono::{NaiveDate, NaiveTime};

    fn ts(h: u32, m: u32) -> DateTime<FixedOffset> {
        ist_datetime(
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            NaiveTime::from_hms_opt(h, m, 0).unwrap(),
        )
    }

    fn bar(high: f64, low: f64) -> Candle {
        Candle {
            timestamp: ts(10, 5),
            open: (high + low) / 2.0,
            high,
            low,
            close: (high + low) / 2.0,
            volume: 1000,
        }
    }

    fn long_trade() -> OpenTrade {
        OpenTrade::new(
            TradeId::new("X-1"),
            "X",
            Side::Long,
            500,
            102.0,
            ts(10, 0),
            99.0,
            104.2,
            Some(106.4),
            0.3,
        )
    }

    #[test]
    fn close_qty_conserves() {
        let mut t = long_trade();
        assert_eq!(t.close_qty(150), 150);
        assert_eq!(t.close_qty(1000), 350);
        assert_eq!(t.qty_open + t.qty_closed, t.qty_initial);
        assert!(t.is_flat());
    }

    #[test]
    fn book_fraction_is_clamped() {
        let t = OpenTrade::new(
            TradeId::new("X-2"),
            "X",
            Side::Long,
            10,
            1.0,
            ts(10, 0),
            0.5,
            2.0,
            None,
            1.0,
        );
        assert!((t.t1_book_fraction - 0.95).abs() < 1e-12);
    }

    #[test]
    fn hit_checks_are_side_aware() {
        let t = long_trade();
        assert!(t.stop_hit(&bar(101.0, 98.9)));
        assert!(t.t1_hit(&bar(104.3, 103.0)));
        assert!(!t.t2_hit(&bar(104.3, 103.0)));

        let mut s = long_trade();
        s.side = Side::Short;
        s.stop = 105.0;
        s.t1 = 99.8;
        assert!(s.stop_hit(&bar(105.0, 101.0)));
        assert!(s.t1_hit(&bar(101.0, 99.7)));
        assert!((s.pnl_per_share(100.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn exit_reason_wire_names() {
        let json = serde_json::to_string(&ExitReason::T1Partial).unwrap();
        assert_eq!(json, "\"T1_PARTIAL\"");
        assert_eq!(ExitReason::RunnerExit.as_str(), "RUNNER_EXIT");
    }
}
