//! Time-series payloads returned by the graph endpoint.

use serde::{Deserialize, Serialize};

/// One day of raw rates, each a fraction in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGraphPoint {
    /// `YYYY-MM-DD` or an RFC 3339 timestamp
    pub date: String,
    pub win_rate: f64,
    pub ban_rate: f64,
    pub app_rate: f64,
}

impl RawGraphPoint {
    pub fn new(date: impl Into<String>, win_rate: f64, ban_rate: f64, app_rate: f64) -> Self {
        Self {
            date: date.into(),
            win_rate,
            ban_rate,
            app_rate,
        }
    }
}

/// Graph section of a hero payload. Upstream nests the whole series
/// under `win_rate` even though each point carries all three rates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeroGraph {
    #[serde(default)]
    pub win_rate: Option<Vec<RawGraphPoint>>,
}
