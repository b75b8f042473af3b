//! Config file loading: JSON (primary) or TOML into one frozen `AppConfig`.
//!
//! The raw document is first read as an untyped tree so unknown sections and
//! keys can be reported, and so the required risk keys can be told apart from
//! keys that merely took their default.

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use intralab_core::config::{AppConfig, ConfigError};

/// Unique identifier for a run (content-addressed hash prefix).
pub type RunId = String;

/// Keys that must be present in the file; their defaults exist only for tests.
pub const REQUIRED_KEYS: [(&str, &str); 2] =
    [("risk", "risk_capital"), ("risk", "risk_pct_per_trade")];

/// Hex characters kept from the BLAKE3 digest.
const RUN_ID_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML; everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Read, check and validate a config file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&raw, ConfigFormat::from_path(path))
}

pub fn parse_config(raw: &str, format: ConfigFormat) -> Result<AppConfig, ConfigError> {
    let tree: Value = match format {
        ConfigFormat::Json => {
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?
        }
        ConfigFormat::Toml => toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?,
    };
    if !tree.is_object() {
        return Err(ConfigError::Parse("top level must be an object".into()));
    }

    for (section, key) in REQUIRED_KEYS {
        if tree.get(section).and_then(|s| s.get(key)).is_none() {
            return Err(ConfigError::MissingKey(format!("{section}.{key}")));
        }
    }

    for key in unknown_keys(&tree) {
        warn!(key = %key, "ignoring unknown config key");
    }

    let config: AppConfig =
        serde_json::from_value(tree).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Dotted paths of sections and section keys that `AppConfig` does not know.
pub fn unknown_keys(tree: &Value) -> Vec<String> {
    let known = serde_json::to_value(AppConfig::default()).unwrap_or(Value::Null);
    let mut unknown = Vec::new();
    let Some(sections) = tree.as_object() else {
        return unknown;
    };
    for (section, body) in sections {
        let Some(known_section) = known.get(section) else {
            unknown.push(section.clone());
            continue;
        };
        if let (Some(keys), Some(known_keys)) = (body.as_object(), known_section.as_object()) {
            unknown.extend(
                keys.keys()
                    .filter(|k| !known_keys.contains_key(*k))
                    .map(|k| format!("{section}.{k}")),
            );
        }
    }
    unknown
}

/// Everything that determines a run's output besides the market data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    pub config: AppConfig,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl RunConfig {
    pub fn new(config: AppConfig, from: NaiveDate, to: NaiveDate) -> Self {
        Self { config, from, to }
    }

    /// BLAKE3 of the canonical JSON of config and date range, shortened.
    ///
    /// `serde_json::Value` keeps object keys sorted, so the encoding does not
    /// depend on field declaration order.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let canonical = serde_json::to_value(self)
            .and_then(|v| serde_json::to_string(&v))
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        let hash = blake3::hash(canonical.as_bytes());
        Ok(hash.to_hex()[..RUN_ID_LEN].to_string())
    }
}
