//! Evaluation ticks for one session.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime};

use crate::config::{EngineConfig, PrecisionScreenerConfig};
use crate::domain::{ist, ist_datetime};

/// `session_start + i·interval` for every tick not after `session_end`.
pub fn session_ticks(date: NaiveDate, engine: &EngineConfig) -> Vec<DateTime<FixedOffset>> {
    let step = Duration::minutes(engine.interval_min.max(1));
    let end = ist_datetime(date, engine.session_end);
    let mut tick = ist_datetime(date, engine.session_start);
    let mut ticks = Vec::new();
    while tick <= end {
        ticks.push(tick);
        tick += step;
    }
    ticks
}

pub fn tick_time(tick: DateTime<FixedOffset>) -> NaiveTime {
    tick.with_timezone(&ist()).time()
}

pub fn in_lunch(tick: DateTime<FixedOffset>, screener: &PrecisionScreenerConfig) -> bool {
    screener.lunch_window.contains(tick_time(tick))
}

/// No new entries at or after the late cutoff.
pub fn past_late_cutoff(tick: DateTime<FixedOffset>, screener: &PrecisionScreenerConfig) -> bool {
    tick_time(tick) >= screener.late_cutoff
}
