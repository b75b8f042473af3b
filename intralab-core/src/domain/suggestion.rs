use serde::{Deserialize, Serialize};

/// One daily candidate handed to the intraday screener by the swing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub symbol: String,
    #[serde(default)]
    pub score: f64,
}

impl Suggestion {
    pub fn new(symbol: impl Into<String>, score: f64) -> Self {
        Self {
            symbol: symbol.into(),
            score,
        }
    }
}
