//! Upstream call discipline: minimum-interval throttle plus retry with backoff.
//!
//! A remote candle API is wrapped in `ThrottledStore`, which
//! - spaces consecutive upstream calls by at least `min_interval` (350 ms
//!   default) using a mutex-guarded last-call timestamp shared by all workers
//! - retries transient failures (rate limit, timeout) with exponential
//!   backoff: base 1 s, multiplier 2, at most 3 attempts
//! - never retries authentication failures; they surface immediately

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset};
use tracing::{debug, warn};

use super::store::{CandleStore, DataError};
use crate::domain::{Candle, Interval};

/// Per-process minimum spacing between upstream calls.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Default limiter: 350 ms between calls.
    pub fn default_upstream() -> Self {
        Self::new(Duration::from_millis(350))
    }

    /// Block until a call is allowed, then record it. Returns the time waited.
    pub fn acquire(&self) -> Duration {
        let mut last = self.last_call.lock().unwrap_or_else(PoisonError::into_inner);
        let waited = match *last {
            Some(prev) => {
                let elapsed = prev.elapsed();
                if elapsed < self.min_interval {
                    let wait = self.min_interval - elapsed;
                    std::thread::sleep(wait);
                    wait
                } else {
                    Duration::ZERO
                }
            }
            None => Duration::ZERO,
        };
        *last = Some(Instant::now());
        waited
    }
}

/// Exponential backoff for transient upstream errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        self.base_delay.mul_f64(factor)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub fn run<T>(&self, mut op: impl FnMut() -> Result<T, DataError>) -> Result<T, DataError> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    debug!(attempt, ?delay, error = %e, "transient upstream error, backing off");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!(attempts = attempt, error = %e, "upstream retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Candle store wrapper applying the rate limiter and retry policy.
#[derive(Debug)]
pub struct ThrottledStore<S> {
    inner: S,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl<S: CandleStore> ThrottledStore<S> {
    pub fn new(inner: S, limiter: RateLimiter, retry: RetryPolicy) -> Self {
        Self {
            inner,
            limiter,
            retry,
        }
    }

    pub fn with_defaults(inner: S) -> Self {
        Self::new(inner, RateLimiter::default_upstream(), RetryPolicy::default())
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: CandleStore> CandleStore for ThrottledStore<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    ) -> Result<Vec<Candle>, DataError> {
        self.retry.run(|| {
            self.limiter.acquire();
            self.inner.fetch(symbol, interval, from, to)
        })
    }
}
