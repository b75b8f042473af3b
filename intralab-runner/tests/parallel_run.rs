//! Multi-day runs end to end: parallel merge, skipped days, determinism
//! across worker counts, authentication abort and artifact files.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime};
use intralab_core::config::AppConfig;
use intralab_core::data::MemoryCandleStore;
use intralab_core::domain::{ist_datetime, Candle, Interval, Suggestion};
use intralab_core::trade_log::{read_ndjson, TradeEvent};
use intralab_core::{CandleStore, DataError};
use intralab_runner::{
    run_range, write_artifacts, write_suggestions, DayOutcome, RunError, RunRequest, RunSummary,
};

const SYMBOLS: [&str; 2] = ["INFY", "TCS"];

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn run_dates() -> Vec<NaiveDate> {
    vec![date(2024, 3, 4), date(2024, 3, 5), date(2024, 3, 6)]
}

/// Loose gates plus a short 14:00–14:10 window: one entry per symbol per day,
/// flattened at the close of the window.
fn short_window_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.precision_screener.rsi_range = [0.0, 100.0];
    cfg.precision_screener.adx_range = [0.0, 100.0];
    cfg.precision_screener.min_vol_ratio = 0.5;
    cfg.precision_screener.max_breakout_dist_bpct = 50.0;
    cfg.intraday_gate.min_volume_ratio = 0.5;
    cfg.engine.session_start = hm(14, 0);
    cfg.engine.session_end = hm(14, 10);
    cfg
}

fn rising_session(day: NaiveDate) -> Vec<Candle> {
    (0..75)
        .map(|i| {
            let close = 100.0 + 0.2 * i as f64;
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

fn store() -> MemoryCandleStore {
    let mut store = MemoryCandleStore::new();
    for symbol in SYMBOLS {
        for day in run_dates() {
            store.extend(symbol, Interval::FiveMinute, rising_session(day));
            store.extend(
                symbol,
                Interval::Day,
                vec![Candle {
                    timestamp: ist_datetime(day - Duration::days(1), NaiveTime::MIN),
                    open: 99.0,
                    high: 100.0,
                    low: 98.0,
                    close: 99.5,
                    volume: 75_000,
                }],
            );
        }
    }
    store
}

fn suggestions_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let rows: Vec<Suggestion> = SYMBOLS.iter().map(|s| Suggestion::new(*s, 1.0)).collect();
    for day in run_dates() {
        write_suggestions(dir.path(), day, &rows).unwrap();
    }
    dir
}

fn request<'a>(
    store: &'a dyn CandleStore,
    dir: &'a std::path::Path,
    config: &'a AppConfig,
    workers: usize,
) -> RunRequest<'a> {
    RunRequest {
        store,
        suggestions_dir: dir,
        config,
        from: date(2024, 3, 4),
        // 03-07 has no suggestions file
        to: date(2024, 3, 7),
        workers,
    }
}

#[test]
fn three_days_two_symbols_merge_into_six_rows() {
    let store = store();
    let dir = suggestions_dir();
    let cfg = short_window_config();
    let result = run_range(&request(&store, dir.path(), &cfg, 3)).unwrap();

    assert_eq!(result.outcomes.len(), 4);
    assert!(matches!(result.outcomes[3], DayOutcome::Skipped { .. }));
    assert_eq!(
        result.outcomes.iter().map(DayOutcome::date).collect::<Vec<_>>(),
        vec![date(2024, 3, 4), date(2024, 3, 5), date(2024, 3, 6), date(2024, 3, 7)]
    );

    assert_eq!(result.diagnostics.len(), 6);
    let ids: BTreeSet<_> = result.diagnostics.rows().map(|r| r.trade_id.clone()).collect();
    assert_eq!(ids.len(), 6);
    for row in result.diagnostics.rows() {
        assert!(row.is_closed(), "{} still open", row.trade_id);
        assert_eq!(row.qty_exited, row.qty);
        assert_eq!(row.entry_time.time(), hm(14, 0));
    }

    let dates: BTreeSet<_> = result.diagnostics.rows().map(|r| r.date).collect();
    assert_eq!(dates.len(), 3);

    let summary = RunSummary::from_result(&result);
    assert_eq!(summary.days_run, 3);
    assert_eq!(summary.days_skipped, 1);
    assert_eq!(summary.days_failed, 0);
    assert_eq!(summary.trades, 6);
    assert_eq!(summary.exits_by_reason.get("EOD"), Some(&6));
}

#[test]
fn worker_count_does_not_change_output() {
    let store = store();
    let dir = suggestions_dir();
    let cfg = short_window_config();
    let one = run_range(&request(&store, dir.path(), &cfg, 1)).unwrap();
    let many = run_range(&request(&store, dir.path(), &cfg, 4)).unwrap();

    assert_eq!(one.run_id, many.run_id);
    assert_eq!(
        one.diagnostics.export_csv().unwrap(),
        many.diagnostics.export_csv().unwrap()
    );
    assert_eq!(one.events(), many.events());
    assert_eq!(one.diagnostics.exits(), many.diagnostics.exits());
}

#[test]
fn artifacts_are_written_and_readable() {
    let store = store();
    let dir = suggestions_dir();
    let out = tempfile::tempdir().unwrap();
    let cfg = short_window_config();
    let result = run_range(&request(&store, dir.path(), &cfg, 2)).unwrap();
    let paths = write_artifacts(&result, &out.path().join("artifacts")).unwrap();

    let csv = std::fs::read_to_string(&paths.diagnostics).unwrap();
    let mut lines = csv.lines();
    let header = lines.next().unwrap();
    for col in ["trade_id", "symbol", "entry_zone", "trigger_type", "exit_reason", "pnl_actual"] {
        assert!(header.split(',').any(|h| h == col), "missing column {col}");
    }
    assert_eq!(lines.count(), 6);

    let events = read_ndjson(std::io::BufReader::new(
        std::fs::File::open(&paths.events).unwrap(),
    ))
    .unwrap();
    let entries = events
        .iter()
        .filter(|e| matches!(e, TradeEvent::Entry { .. }))
        .count();
    assert_eq!(entries, 6);
    assert_eq!(events.len(), 12);

    let summary: RunSummary =
        serde_json::from_str(&std::fs::read_to_string(&paths.summary).unwrap()).unwrap();
    assert_eq!(summary.run_id, result.run_id);
    assert_eq!(summary.trades, 6);
}

/// A store whose credentials have been revoked.
struct RevokedStore;

impl CandleStore for RevokedStore {
    fn name(&self) -> &str {
        "revoked"
    }

    fn fetch(
        &self,
        _symbol: &str,
        _interval: Interval,
        _from: DateTime<FixedOffset>,
        _to: DateTime<FixedOffset>,
    ) -> Result<Vec<Candle>, DataError> {
        Err(DataError::AuthenticationFailed("session token rejected".into()))
    }
}

#[test]
fn authentication_failure_aborts_the_run() {
    let dir = suggestions_dir();
    let cfg = short_window_config();
    let err = run_range(&request(&RevokedStore, dir.path(), &cfg, 2)).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, RunError::Engine(_)));
}
