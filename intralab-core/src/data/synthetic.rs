//! Deterministic synthetic market for demos, benchmarks and smoke runs.
//!
//! Each symbol gets its own `StdRng` seeded from BLAKE3(seed, symbol), so adding
//! symbols never perturbs existing ones. Every weekday carries 75 five-minute
//! candles (09:15–15:25 IST) following one of three day shapes (trend up,
//! trend down, range) and a daily candle aggregated from them. Suggestions
//! are emitted for every weekday in `[start, end]`.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::memory::MemoryCandleStore;
use crate::domain::{ist_datetime, Candle, Interval, Suggestion};

const TICKERS: [&str; 12] = [
    "RELIANCE", "TCS", "INFY", "HDFCBANK", "ICICIBANK", "SBIN", "LT", "ITC", "AXISBANK",
    "KOTAKBANK", "BHARTIARTL", "MARUTI",
];

/// Bars per session: 09:15 through 15:25 inclusive.
pub const BARS_PER_SESSION: usize = 75;

/// Calendar days of warm-up history generated before `start`.
const WARMUP_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticParams {
    pub seed: u64,
    pub symbols: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct SyntheticMarket {
    pub store: MemoryCandleStore,
    pub suggestions: BTreeMap<NaiveDate, Vec<Suggestion>>,
}

#[derive(Debug, Clone, Copy)]
enum DayShape {
    TrendUp,
    TrendDown,
    Range,
}

/// Symbol names for a universe of `n`: well-known tickers, then numbered.
pub fn symbol_names(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| match TICKERS.get(i) {
            Some(t) => (*t).to_string(),
            None => format!("SYN{i:03}"),
        })
        .collect()
}

fn is_weekday(d: NaiveDate) -> bool {
    !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

fn symbol_rng(seed: u64, symbol: &str) -> StdRng {
    let hash = blake3::hash(format!("{seed}:{symbol}").as_bytes());
    StdRng::from_seed(*hash.as_bytes())
}

fn session_candles(rng: &mut StdRng, date: NaiveDate, open_px: f64) -> Vec<Candle> {
    let shape = match rng.gen_range(0..10) {
        0..=3 => DayShape::TrendUp,
        4..=5 => DayShape::TrendDown,
        _ => DayShape::Range,
    };
    let drift = match shape {
        DayShape::TrendUp => rng.gen_range(0.0004..0.0012),
        DayShape::TrendDown => -rng.gen_range(0.0004..0.0012),
        DayShape::Range => 0.0,
    };
    let base_volume = rng.gen_range(20_000..200_000u64);
    let open_time = NaiveTime::from_hms_opt(9, 15, 0).unwrap_or(NaiveTime::MIN);

    let mut out = Vec::with_capacity(BARS_PER_SESSION);
    let mut price = open_px;
    for i in 0..BARS_PER_SESSION {
        let noise: f64 = rng.gen_range(-0.0015..0.0015);
        let open = price;
        let close = (price * (1.0 + drift + noise)).max(1.0);
        let wick = price * rng.gen_range(0.0002..0.0015);
        let high = open.max(close) + wick;
        let low = (open.min(close) - wick).max(0.5);
        // U-shaped intraday volume with a kicker on directional days
        let u = ((i as f64 - 37.0) / 37.0).powi(2);
        let kicker = if matches!(shape, DayShape::Range) { 1.0 } else { 1.4 };
        let volume = (base_volume as f64 * (0.6 + u) * kicker * rng.gen_range(0.7..1.3)) as u64;

        out.push(Candle {
            timestamp: ist_datetime(date, open_time + Duration::minutes(5 * i as i64)),
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
    }
    out
}

fn daily_from_session(date: NaiveDate, session: &[Candle]) -> Option<Candle> {
    let first = session.first()?;
    let last = session.last()?;
    Some(Candle {
        timestamp: ist_datetime(date, NaiveTime::MIN),
        open: first.open,
        high: session.iter().map(|c| c.high).fold(f64::MIN, f64::max),
        low: session.iter().map(|c| c.low).fold(f64::MAX, f64::min),
        close: last.close,
        volume: session.iter().map(|c| c.volume).sum(),
    })
}

impl SyntheticMarket {
    pub fn generate(params: &SyntheticParams) -> Self {
        let mut store = MemoryCandleStore::new();
        let mut suggestions: BTreeMap<NaiveDate, Vec<Suggestion>> = BTreeMap::new();
        let names = symbol_names(params.symbols);

        for symbol in &names {
            let mut rng = symbol_rng(params.seed, symbol);
            let mut price: f64 = rng.gen_range(80.0..2500.0);
            let mut intraday = Vec::new();
            let mut daily = Vec::new();

            let mut day = params.start - Duration::days(WARMUP_DAYS);
            while day <= params.end {
                if is_weekday(day) {
                    let gap: f64 = rng.gen_range(-0.006..0.008);
                    let session = session_candles(&mut rng, day, price * (1.0 + gap));
                    if let Some(d) = daily_from_session(day, &session) {
                        price = d.close;
                        daily.push(d);
                    }
                    if day >= params.start {
                        let score = (rng.gen_range(0.0..1.0_f64) * 100.0).round() / 100.0;
                        suggestions
                            .entry(day)
                            .or_default()
                            .push(Suggestion::new(symbol.clone(), score));
                    }
                    intraday.extend(session);
                }
                day += Duration::days(1);
            }

            store.insert(symbol.clone(), Interval::FiveMinute, intraday);
            store.insert(symbol.clone(), Interval::Day, daily);
        }

        Self { store, suggestions }
    }

    /// Weekdays covered by the generated suggestions.
    pub fn trading_days(&self) -> Vec<NaiveDate> {
        self.suggestions.keys().copied().collect()
    }
}
