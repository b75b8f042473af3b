//! IntraLab Core: intraday backtest engine for the Indian cash market.
//!
//! This crate contains:
//! - Domain types (candles, IST clock, open trades, trade IDs)
//! - Candle store trait with memory, CSV, throttled and synthetic stores
//! - Indicator kernel and the per-tick session snapshot
//! - Level extraction, precision screener, ranker and trade planner
//! - The day session loop with entry triggers and exit management
//! - Diagnostics recorder and the NDJSON trade-event log

pub mod acceptance;
pub mod config;
pub mod data;
pub mod diagnostics;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod levels;
pub mod planner;
pub mod ranker;
pub mod screener;
pub mod session;
pub mod trade_log;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{AppConfig, ConfigError};
pub use data::{CandleStore, DataError};
pub use engine::{run_day_session, DayReport, DaySession, EngineError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything shared across day workers is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::OpenTrade>();
        require_sync::<domain::OpenTrade>();
        require_send::<domain::Suggestion>();
        require_sync::<domain::Suggestion>();

        // Config and stores
        require_send::<AppConfig>();
        require_sync::<AppConfig>();
        require_send::<data::MemoryCandleStore>();
        require_sync::<data::MemoryCandleStore>();
        require_send::<data::CsvCandleStore>();
        require_sync::<data::CsvCandleStore>();
        require_send::<data::ThrottledStore<data::CsvCandleStore>>();
        require_sync::<data::ThrottledStore<data::CsvCandleStore>>();

        // Pipeline outputs
        require_send::<screener::Candidate>();
        require_sync::<screener::Candidate>();
        require_send::<planner::Plan>();
        require_sync::<planner::Plan>();
        require_send::<engine::DayReport>();
        require_sync::<engine::DayReport>();
        require_send::<diagnostics::DiagnosticsRecorder>();
        require_send::<EngineError>();
        require_sync::<EngineError>();
    }

    /// The day loop takes the store as a trait object so any shared store works.
    #[test]
    fn day_session_accepts_any_store() {
        fn _build<'a>(
            store: &'a dyn CandleStore,
            config: &'a AppConfig,
        ) -> DaySession<'a> {
            DaySession {
                date: chrono::NaiveDate::MIN,
                store,
                suggestions: &[],
                config,
            }
        }
    }
}
