//! Candle store trait and structured error types.
//!
//! The CandleStore trait abstracts over candle sources (CSV files, memory,
//! a throttled remote API) so the engine can be driven from any of them and
//! mocked in tests.

use chrono::{DateTime, FixedOffset};
use thiserror::Error;

use crate::domain::{Candle, Interval};

/// Structured error types for candle reads.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no {interval} candles for symbol '{symbol}'")]
    NotFound { symbol: String, interval: Interval },

    #[error("rate limited by upstream: {0}")]
    RateLimited(String),

    #[error("upstream timeout: {0}")]
    Timeout(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("failed to parse candles from {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Rate limits and timeouts are retried; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, DataError::RateLimited(_) | DataError::Timeout(_))
    }

    /// Credential rejections abort the whole run.
    pub fn is_auth(&self) -> bool {
        matches!(self, DataError::AuthenticationFailed(_))
    }
}

/// Read-only provider of OHLCV candles.
///
/// Implementations must be safe for concurrent readers: one store is shared
/// by every day worker of a parallel run.
pub trait CandleStore: Send + Sync {
    /// Human-readable name of this store.
    fn name(&self) -> &str;

    /// Candles for `symbol` at `interval` with `from <= timestamp <= to`,
    /// ordered by timestamp.
    fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    ) -> Result<Vec<Candle>, DataError>;
}

/// Slice an ordered candle series to `[from, to]` using binary search.
pub(crate) fn slice_window<'a>(
    candles: &'a [Candle],
    from: DateTime<FixedOffset>,
    to: DateTime<FixedOffset>,
) -> &'a [Candle] {
    let lo = candles.partition_point(|c| c.timestamp < from);
    let hi = candles.partition_point(|c| c.timestamp <= to);
    if lo >= hi {
        &[]
    } else {
        &candles[lo..hi]
    }
}
