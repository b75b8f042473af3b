//! IntraLab CLI: backtest runs, single-tick screens and synthetic data.
//!
//! Commands:
//! - `run`: replay a date range over a CSV candle store and write artifacts
//! - `screen`: screen, rank and plan one tick, printing JSON
//! - `synth`: write a deterministic synthetic candle store and suggestions

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use intralab_core::config::AppConfig;
use intralab_core::data::{write_candles_csv, CsvCandleStore, SyntheticMarket, SyntheticParams, ThrottledStore};
use intralab_core::domain::{ist_datetime, Interval};
use intralab_core::planner::{PlanOutcome, TradePlanner};
use intralab_core::ranker::rank;
use intralab_core::screener::PrecisionScreener;
use intralab_core::CandleStore;
use intralab_runner::{
    load_config, load_suggestions, run_range, write_artifacts, write_suggestions, RunRequest,
    RunSummary, DEFAULT_WORKERS,
};

#[derive(Parser)]
#[command(name = "intralab", about = "IntraLab CLI: intraday backtest engine for NSE cash equities")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay every date in a range and write diagnostics, events and summary.
    Run {
        /// First date (YYYY-MM-DD).
        #[arg(long)]
        from: String,

        /// Last date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        to: String,

        /// JSON or TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Candle store root (`<SYMBOL>/<interval>.csv`).
        #[arg(long, default_value = "data/candles")]
        candles: PathBuf,

        /// Directory of `suggestions_all_YYYY-MM-DD.json` files.
        #[arg(long, default_value = "data/suggestions")]
        suggestions: PathBuf,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        out: PathBuf,

        /// Parallel day workers.
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,

        /// Pace and retry store reads as for a remote upstream.
        #[arg(long, default_value_t = false)]
        throttle: bool,
    },
    /// Screen, rank and plan a single tick and print the picks as JSON.
    Screen {
        /// Trading date (YYYY-MM-DD).
        #[arg(long)]
        date: String,

        /// Tick time (HH:MM, IST).
        #[arg(long)]
        time: String,

        /// JSON or TOML config file.
        #[arg(long)]
        config: PathBuf,

        #[arg(long, default_value = "data/candles")]
        candles: PathBuf,

        #[arg(long, default_value = "data/suggestions")]
        suggestions: PathBuf,
    },
    /// Write a synthetic candle store, suggestions files and a starter config.
    Synth {
        /// Output root; `candles/`, `suggestions/` and `config.json` go here.
        #[arg(long)]
        out: PathBuf,

        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// Universe size.
        #[arg(long, default_value_t = 8)]
        symbols: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            from,
            to,
            config,
            candles,
            suggestions,
            out,
            workers,
            throttle,
        } => run_cmd(
            parse_date(&from)?,
            parse_date(&to)?,
            &config,
            candles,
            &suggestions,
            &out,
            workers,
            throttle,
        ),
        Commands::Screen {
            date,
            time,
            config,
            candles,
            suggestions,
        } => screen_cmd(parse_date(&date)?, parse_time(&time)?, &config, candles, &suggestions),
        Commands::Synth {
            out,
            from,
            to,
            symbols,
            seed,
        } => synth_cmd(&out, parse_date(&from)?, parse_date(&to)?, symbols, seed),
    }
}

/// Log to stderr with an `EnvFilter`; `RUST_LOG` overrides the INFO default.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init()
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date '{raw}'"))
}

fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M").with_context(|| format!("invalid time '{raw}'"))
}

fn open_store(candles: PathBuf, throttle: bool) -> Result<Box<dyn CandleStore>> {
    if !candles.is_dir() {
        bail!("candle store {} is not a directory", candles.display());
    }
    let store = CsvCandleStore::new(candles);
    Ok(if throttle {
        Box::new(ThrottledStore::with_defaults(store))
    } else {
        Box::new(store)
    })
}

#[allow(clippy::too_many_arguments)]
fn run_cmd(
    from: NaiveDate,
    to: NaiveDate,
    config_path: &Path,
    candles: PathBuf,
    suggestions: &Path,
    out: &Path,
    workers: usize,
    throttle: bool,
) -> Result<()> {
    let config = load_config(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let store = open_store(candles, throttle)?;

    let result = run_range(&RunRequest {
        store: store.as_ref(),
        suggestions_dir: suggestions,
        config: &config,
        from,
        to,
        workers,
    })?;
    let paths = write_artifacts(&result, out)?;
    let summary = RunSummary::from_result(&result);

    println!("Run {}  {} → {}", summary.run_id, summary.from, summary.to);
    println!(
        "  days run {}  skipped {}  failed {}",
        summary.days_run, summary.days_skipped, summary.days_failed
    );
    for failure in &summary.failures {
        println!("    {}: {}", failure.date, failure.error);
    }
    println!("  trades {}  total PnL {:.2}", summary.trades, summary.total_pnl);
    if let Some(rate) = summary.win_rate {
        println!("  win rate {:.1}%", rate * 100.0);
    }
    for (reason, count) in &summary.exits_by_reason {
        println!("  {reason:<12} {count}");
    }
    println!("Diagnostics: {}", paths.diagnostics.display());
    println!("Events:      {}", paths.events.display());
    println!("Summary:     {}", paths.summary.display());
    Ok(())
}

fn screen_cmd(
    date: NaiveDate,
    time: NaiveTime,
    config_path: &Path,
    candles: PathBuf,
    suggestions_dir: &Path,
) -> Result<()> {
    let config = load_config(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let store = open_store(candles, false)?;
    let Some(suggestions) = load_suggestions(suggestions_dir, date)? else {
        bail!("no suggestions file for {date}");
    };

    let tick = ist_datetime(date, time);
    let outcome = PrecisionScreener::new(store.as_ref(), &config).screen(&suggestions, tick)?;
    info!(%tick, stats = %outcome.stats, "screen complete");

    let planner = TradePlanner::new(&config);
    let picks: Vec<serde_json::Value> = rank(outcome.candidates, config.engine.top_n)
        .iter()
        .enumerate()
        .map(|(i, ranked)| {
            let c = &ranked.candidate;
            let plan = match planner.plan_candidate(c) {
                PlanOutcome::Plan(plan) => json!(plan),
                PlanOutcome::NoSetup(reason) => json!({ "no_setup": reason.as_str() }),
            };
            json!({
                "rank": i + 1,
                "symbol": c.symbol,
                "bias": c.bias,
                "rank_score": ranked.rank_score,
                "intraday_score": ranked.intraday_score,
                "level": { "type": c.level.kind, "price": c.level.price },
                "dist_from_level_bpct": c.dist_from_level_bpct,
                "acceptance_ok": c.acceptance.ok(),
                "features": c.features,
                "plan": plan,
            })
        })
        .collect();

    let body = json!({
        "tick": tick.to_rfc3339(),
        "gate_stats": outcome.stats,
        "picks": picks,
    });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn synth_cmd(out: &Path, from: NaiveDate, to: NaiveDate, symbols: usize, seed: u64) -> Result<()> {
    if from > to {
        bail!("--from {from} is after --to {to}");
    }
    if symbols == 0 {
        bail!("--symbols must be at least 1");
    }
    let market = SyntheticMarket::generate(&SyntheticParams {
        seed,
        symbols,
        start: from,
        end: to,
    });

    let candles = CsvCandleStore::new(out.join("candles"));
    for symbol in market.store.symbols() {
        for interval in [Interval::Day, Interval::FiveMinute] {
            if let Some(series) = market.store.series(&symbol, interval) {
                let path = candles.series_path(&symbol, interval);
                write_candles_csv(&path, series)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
        }
    }

    let suggestions_dir = out.join("suggestions");
    std::fs::create_dir_all(&suggestions_dir)
        .with_context(|| format!("failed to create {}", suggestions_dir.display()))?;
    for (date, rows) in &market.suggestions {
        write_suggestions(&suggestions_dir, *date, rows)?;
    }

    let config_path = out.join("config.json");
    let config = serde_json::to_string_pretty(&AppConfig::default())?;
    std::fs::write(&config_path, config)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    println!(
        "Wrote {} symbols, {} trading days to {}",
        symbols,
        market.trading_days().len(),
        out.display()
    );
    Ok(())
}
