//! Criterion benchmarks for intralab hot paths.
//!
//! Benchmarks:
//! 1. Session snapshot build (every indicator column over one session)
//! 2. Precision screen of a universe at one tick
//! 3. A full synthetic trading day through the engine loop

use chrono::{NaiveDate, NaiveTime};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use intralab_core::config::AppConfig;
use intralab_core::data::{CandleStore, SyntheticMarket, SyntheticParams};
use intralab_core::diagnostics::DiagnosticsRecorder;
use intralab_core::domain::{ist_datetime, Interval};
use intralab_core::engine::{run_day_session, DaySession};
use intralab_core::screener::PrecisionScreener;
use intralab_core::session::SessionSnapshot;

// ── Helpers ──────────────────────────────────────────────────────────

fn bench_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
}

fn market(symbols: usize) -> SyntheticMarket {
    SyntheticMarket::generate(&SyntheticParams {
        seed: 42,
        symbols,
        start: bench_day(),
        end: bench_day(),
    })
}

// ── 1. Snapshot ──────────────────────────────────────────────────────

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_snapshot");
    let cfg = AppConfig::default();
    let m = market(1);
    let from = ist_datetime(bench_day(), NaiveTime::from_hms_opt(9, 15, 0).unwrap());
    let to = ist_datetime(bench_day(), NaiveTime::from_hms_opt(15, 25, 0).unwrap());
    let bars = m.store.fetch("RELIANCE", Interval::FiveMinute, from, to).unwrap();

    for n in [12, 40, 75] {
        let tick = bars[n - 1].timestamp;
        group.bench_with_input(BenchmarkId::new("bars", n), &tick, |b, tick| {
            b.iter(|| SessionSnapshot::build("RELIANCE", black_box(&bars), *tick, &cfg));
        });
    }
    group.finish();
}

// ── 2. Screen ────────────────────────────────────────────────────────

fn bench_screen(c: &mut Criterion) {
    let mut group = c.benchmark_group("precision_screen");
    let cfg = AppConfig::default();
    let m = market(12);
    let suggestions = &m.suggestions[&bench_day()];
    let tick = ist_datetime(bench_day(), NaiveTime::from_hms_opt(11, 30, 0).unwrap());

    group.bench_function("12_symbols_midday", |b| {
        let screener = PrecisionScreener::new(&m.store, &cfg);
        b.iter(|| screener.screen(black_box(suggestions), tick).unwrap());
    });
    group.finish();
}

// ── 3. Day Loop ──────────────────────────────────────────────────────

fn bench_day_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("day_loop");
    group.sample_size(10);
    let cfg = AppConfig::default();

    for symbols in [5, 12] {
        let m = market(symbols);
        let suggestions = m.suggestions[&bench_day()].clone();
        group.bench_with_input(BenchmarkId::new("symbols", symbols), &symbols, |b, _| {
            b.iter(|| {
                let session = DaySession {
                    date: bench_day(),
                    store: &m.store,
                    suggestions: &suggestions,
                    config: &cfg,
                };
                let mut rec = DiagnosticsRecorder::new();
                run_day_session(&session, &mut rec).unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_snapshot, bench_screen, bench_day_loop);
criterion_main!(benches);
