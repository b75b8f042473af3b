//! Intraday session engine: ticks, entry triggers, exit management and the
//! day loop that ties the screener, ranker and planner together.

pub mod day;
pub mod entry;
pub mod exits;
pub mod rebalance;
pub mod runner_hold;
pub mod ticks;

pub use day::{run_day_session, DayReport, DaySession, EngineError};
pub use entry::{EntrySignal, TriggerType};
pub use exits::{evaluate_exits, ExitFill, TrailContext};
pub use rebalance::pick_replacement;
pub use ticks::session_ticks;
