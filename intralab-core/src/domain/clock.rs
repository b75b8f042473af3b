//! IST wall-clock helpers.
//!
//! The Indian cash market trades 09:15–15:30 IST (+05:30, no DST), so a fixed
//! offset is sufficient for every timestamp in the system.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Seconds east of UTC for Indian Standard Time.
pub const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// The IST fixed offset.
pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).expect("+05:30 is a valid UTC offset")
}

/// Build an IST timestamp from a session date and wall-clock time.
pub fn ist_datetime(date: NaiveDate, time: NaiveTime) -> DateTime<FixedOffset> {
    let local = date.and_time(time);
    let utc = local - Duration::seconds(i64::from(IST_OFFSET_SECS));
    DateTime::from_naive_utc_and_offset(utc, ist())
}

/// Inclusive wall-clock window, e.g. the 12:15–13:15 lunch window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Serde adapter for "HH:MM" wall-clock strings (seconds accepted on input).
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveTime, String> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|_| format!("invalid time '{raw}' (expected HH:MM)"))
    }
}
