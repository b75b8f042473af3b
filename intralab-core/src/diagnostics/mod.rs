//! Diagnostics recorder and its CSV row schema.

pub mod recorder;
pub mod row;

pub use recorder::{take_thread_recorder, with_recorder, DiagnosticsError, DiagnosticsRecorder};
pub use row::DiagnosticsRow;
