use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::clock::ist;

/// Trade ID: `{SYMBOL}-{YYYYMMDDHHMM}-{seq}`.
///
/// The entry timestamp makes IDs unique across days; `seq` disambiguates
/// entries within one day's session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeId(pub String);

impl TradeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn compose(symbol: &str, entry_time: DateTime<FixedOffset>, seq: u32) -> Self {
        let stamp = entry_time.with_timezone(&ist()).format("%Y%m%d%H%M");
        Self(format!("{symbol}-{stamp}-{seq}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
