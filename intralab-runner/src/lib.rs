//! IntraLab Runner: multi-day orchestration over `intralab-core`.
//!
//! This crate provides:
//! - Config file loading (JSON/TOML) with required-key checks and run IDs
//! - Suggestions file loading
//! - Single-day runner and the bounded parallel multi-day runner
//! - Run summary metrics and artifact export

pub mod config;
pub mod export;
pub mod parallel;
pub mod runner;
pub mod suggestions;
pub mod summary;

pub use config::{load_config, parse_config, ConfigFormat, RunConfig, RunId};
pub use export::{write_artifacts, ArtifactPaths};
pub use parallel::{calendar_days, run_range, RunRequest, RunResult, DEFAULT_WORKERS};
pub use runner::{run_day, DayOutcome, RunError};
pub use suggestions::{load_suggestions, parse_suggestions, suggestions_path, write_suggestions};
pub use summary::{DayFailure, RunSummary};
