//! Candle stores: the read-only OHLCV boundary of the engine.
//!
//! - `store`: the `CandleStore` trait and structured `DataError`
//! - `memory`: in-memory store for tests and synthetic runs
//! - `csv_store`: per-symbol CSV files on disk, cached after first read
//! - `throttle`: minimum-interval rate limiter, retry policy and wrapper store
//! - `synthetic`: deterministic seeded market generator

pub mod csv_store;
pub mod memory;
pub mod store;
pub mod synthetic;
pub mod throttle;

pub use csv_store::{write_candles_csv, CsvCandleStore};
pub use memory::MemoryCandleStore;
pub use store::{CandleStore, DataError};
pub use synthetic::{SyntheticMarket, SyntheticParams};
pub use throttle::{RateLimiter, RetryPolicy, ThrottledStore};
