//! Per-run diagnostics: entry rows keyed by trade ID plus the ordered exit
//! event stream.
//!
//! The session loop takes an explicit `&mut DiagnosticsRecorder`. Parallel
//! runs give every worker thread its own instance through
//! [`with_recorder`] and collect them with [`take_thread_recorder`].

use std::cell::RefCell;
use std::collections::BTreeMap;

use thiserror::Error;
use tracing::warn;

use super::row::DiagnosticsRow;
use crate::domain::TradeId;
use crate::engine::exits::ExitFill;

#[derive(Debug, Error)]
pub enum DiagnosticsError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("CSV writer flush failed: {0}")]
    Flush(String),
}

#[derive(Debug, Clone, Default)]
pub struct DiagnosticsRecorder {
    rows: BTreeMap<TradeId, DiagnosticsRow>,
    exits: Vec<ExitFill>,
}

impl DiagnosticsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_entry(&mut self, row: DiagnosticsRow) {
        if self.rows.contains_key(&row.trade_id) {
            warn!(trade_id = %row.trade_id, "duplicate entry row replaced");
        }
        self.rows.insert(row.trade_id.clone(), row);
    }

    /// Append the exit to the event list and fold it into its entry row.
    pub fn record_exit(&mut self, exit: &ExitFill) {
        match self.rows.get_mut(&exit.trade_id) {
            Some(row) => row.apply_exit(exit),
            None => warn!(trade_id = %exit.trade_id, "exit without a recorded entry"),
        }
        self.exits.push(exit.clone());
    }

    pub fn reset_intraday(&mut self) {
        self.rows.clear();
        self.exits.clear();
    }

    /// Absorb another recorder. Rows are keyed by trade ID, so merging the same
    /// trade twice keeps one row. Exits stay in time order whatever order the
    /// recorders are merged in.
    pub fn merge(&mut self, other: DiagnosticsRecorder) {
        self.rows.extend(other.rows);
        self.exits.extend(other.exits);
        self.exits
            .sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.trade_id.cmp(&b.trade_id)));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, trade_id: &TradeId) -> Option<&DiagnosticsRow> {
        self.rows.get(trade_id)
    }

    /// Rows in trade-ID order.
    pub fn rows(&self) -> impl Iterator<Item = &DiagnosticsRow> {
        self.rows.values()
    }

    pub fn exits(&self) -> &[ExitFill] {
        &self.exits
    }

    /// Exits of one trade, in the order they happened.
    pub fn exits_for<'a>(&'a self, trade_id: &'a TradeId) -> impl Iterator<Item = &'a ExitFill> {
        self.exits.iter().filter(move |e| &e.trade_id == trade_id)
    }

    /// One CSV line per trade, sorted by trade ID.
    pub fn export_csv(&self) -> Result<String, DiagnosticsError> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for row in self.rows.values() {
            wtr.serialize(row)?;
        }
        let data = wtr
            .into_inner()
            .map_err(|e| DiagnosticsError::Flush(e.error().to_string()))?;
        Ok(String::from_utf8(data)?)
    }
}

thread_local! {
    static RECORDER: RefCell<DiagnosticsRecorder> = RefCell::new(DiagnosticsRecorder::new());
}

/// Run `f` against this thread's recorder.
pub fn with_recorder<R>(f: impl FnOnce(&mut DiagnosticsRecorder) -> R) -> R {
    RECORDER.with(|cell| f(&mut cell.borrow_mut()))
}

/// Move this thread's recorder out, leaving an empty one behind.
pub fn take_thread_recorder() -> DiagnosticsRecorder {
    RECORDER.with(|cell| std::mem::take(&mut *cell.borrow_mut()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExitReason, Side};
    use crate::engine::entry::{EntrySignal, TriggerType};
    use crate::ranker::rank;
    use crate::test_support::{at, candidate, long_plan};
    use crate::domain::OpenTrade;

    fn entry_row(seq: u32) -> (OpenTrade, DiagnosticsRow) {
        let plan = long_plan([101.9, 102.1], 99.0, 104.2, 106.4);
        let ranked = rank(vec![candidate("INFY", 100.0, 2.0, 0.1)], 7).remove(0);
        let trade = OpenTrade::new(
            TradeId::compose("INFY", at(10, 0), seq),
            "INFY",
            Side::Long,
            500,
            102.0,
            at(10, 0),
            99.0,
            104.2,
            Some(106.4),
            0.3,
        );
        let signal = EntrySignal {
            trigger: TriggerType::ZoneTouch,
            price: 102.0,
            dist_to_zone_bpct: 0.0,
        };
        let row = DiagnosticsRow::entry(&trade, &plan, &ranked, 1, &signal);
        (trade, row)
    }

    fn exit(trade: &OpenTrade, reason: ExitReason, price: f64, qty: u64, m: u32) -> ExitFill {
        let pps = price - trade.entry_price;
        ExitFill {
            trade_id: trade.trade_id.clone(),
            symbol: trade.symbol.clone(),
            side: trade.side,
            reason,
            price,
            qty,
            time: at(10, m),
            pnl_per_share: pps,
            pnl_actual: pps * qty as f64,
            pnl_pct: pps / trade.entry_price * 100.0,
        }
    }

    #[test]
    fn exits_fold_into_the_entry_row() {
        let (trade, row) = entry_row(1);
        let mut rec = DiagnosticsRecorder::new();
        rec.record_entry(row);
        rec.record_exit(&exit(&trade, ExitReason::T1Partial, 104.2, 150, 5));
        rec.record_exit(&exit(&trade, ExitReason::T2, 106.4, 350, 15));

        let row = rec.row(&trade.trade_id).unwrap();
        assert_eq!(row.exit_reason, Some(ExitReason::T2));
        assert_eq!(row.exit_qty, Some(350));
        assert_eq!(row.qty_exited, 500);
        assert!(row.is_closed());
        assert_eq!(row.t1_partial_qty, Some(150));
        assert_eq!(row.t1_partial_price, Some(104.2));
        assert_eq!(row.holding_minutes, Some(15));
        assert!((row.realized_pnl - (2.2 * 150.0 + 4.4 * 350.0)).abs() < 1e-6);
        assert_eq!(rec.exits_for(&trade.trade_id).count(), 2);
    }

    #[test]
    fn csv_has_one_line_per_trade() {
        let mut rec = DiagnosticsRecorder::new();
        for seq in 1..=3 {
            let (_, row) = entry_row(seq);
            rec.record_entry(row);
        }
        let csv = rec.export_csv().unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("trade_id,date,symbol,side"));
        assert!(header.contains("t1_partial_qty"));
        assert!(header.contains("fib_nearest"));
        assert_eq!(lines.count(), 3);
    }

    #[test]
    fn merge_and_reset() {
        let mut a = DiagnosticsRecorder::new();
        let mut b = DiagnosticsRecorder::new();
        a.record_entry(entry_row(1).1);
        b.record_entry(entry_row(2).1);
        b.record_entry(entry_row(1).1);
        a.merge(b);
        assert_eq!(a.len(), 2);
        a.reset_intraday();
        assert!(a.is_empty());
        assert!(a.exits().is_empty());
    }

    #[test]
    fn thread_recorder_is_taken_once() {
        with_recorder(|rec| rec.record_entry(entry_row(7).1));
        let taken = take_thread_recorder();
        assert_eq!(taken.len(), 1);
        assert!(take_thread_recorder().is_empty());
    }
}
