//! Domain types for IntraLab

pub mod candle;
pub mod clock;
pub mod ids;
pub mod suggestion;
pub mod trade;

pub use candle::{Candle, Interval, IntervalParseError};
pub use clock::{ist, ist_datetime, TimeWindow};
pub use ids::TradeId;
pub use suggestion::Suggestion;
pub use trade::{ExitReason, OpenTrade, Side, TradeMeta, TrailRule};

/// Symbol type alias
pub type Symbol = String;
