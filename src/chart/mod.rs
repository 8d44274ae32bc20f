//! Chart data preparation.
//!
//! Turns the raw daily rate series from the graph endpoint into
//! display points and derives what a line chart needs around them:
//! - Percentage conversion and date labels
//! - Y-axis domain with padding
//! - Day-over-day deltas for the hover tooltip
//!
//! Normalization is fail-soft: a malformed payload becomes an empty
//! series instead of an error.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::models::{HeroGraph, RawGraphPoint};

/// Fraction of the value range added above and below the series.
pub const AXIS_PADDING_RATIO: f64 = 0.1;

/// Smallest padding, in percentage points.
pub const AXIS_MIN_PADDING: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("Invalid date '{0}'")]
    InvalidDate(String),

    #[error("Non-finite {metric} on {date}")]
    NonFiniteRate { metric: &'static str, date: String },

    #[error("Unexpected graph payload: {0}")]
    Payload(String),
}

/// Which rate the chart is plotting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Win,
    Ban,
    Pick,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Win => "Win Rate",
            Metric::Ban => "Ban Rate",
            Metric::Pick => "Pick Rate",
        }
    }

    fn field(&self) -> &'static str {
        match self {
            Metric::Win => "win_rate",
            Metric::Ban => "ban_rate",
            Metric::Pick => "app_rate",
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "win" | "win_rate" => Ok(Metric::Win),
            "ban" | "ban_rate" => Ok(Metric::Ban),
            "pick" | "app" | "app_rate" => Ok(Metric::Pick),
            other => Err(format!("Unknown metric: {}", other)),
        }
    }
}

/// A chart-ready point. Rates are percentages with two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayPoint {
    /// Short axis label, e.g. "Jan 1"
    pub label: String,
    pub date: NaiveDate,
    pub win_rate: f64,
    pub ban_rate: f64,
    pub app_rate: f64,
}

impl DisplayPoint {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Win => self.win_rate,
            Metric::Ban => self.ban_rate,
            Metric::Pick => self.app_rate,
        }
    }
}

// ── Normalization ───────────────────────────────────────────────

/// Convert a raw series into display points sorted by date.
///
/// Absent and empty input both give an empty series.
pub fn try_normalize(raw: Option<&[RawGraphPoint]>) -> Result<Vec<DisplayPoint>, NormalizeError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    let mut points = raw
        .iter()
        .map(to_display_point)
        .collect::<Result<Vec<_>, _>>()?;
    points.sort_by_key(|p| p.date);
    Ok(points)
}

/// Fail-soft [`try_normalize`]: errors are logged and yield no data.
pub fn normalize_series(raw: Option<&[RawGraphPoint]>) -> Vec<DisplayPoint> {
    try_normalize(raw).unwrap_or_else(|e| {
        warn!("Discarding graph series: {}", e);
        Vec::new()
    })
}

/// Normalize a graph payload as returned by the upstream API.
///
/// Accepts `{"graph": {"win_rate": [...]}}`, `{"win_rate": [...]}` or a
/// bare array of points. Anything else degrades to an empty series.
pub fn normalize_graph_payload(payload: &Value) -> Vec<DisplayPoint> {
    match parse_graph_payload(payload) {
        Ok(raw) => normalize_series(raw.as_deref()),
        Err(e) => {
            warn!("Discarding graph payload: {}", e);
            Vec::new()
        }
    }
}

fn parse_graph_payload(payload: &Value) -> Result<Option<Vec<RawGraphPoint>>, NormalizeError> {
    let section = match payload {
        Value::Null => return Ok(None),
        Value::Array(_) => {
            return serde_json::from_value(payload.clone())
                .map(Some)
                .map_err(|e| NormalizeError::Payload(e.to_string()));
        }
        Value::Object(map) => map.get("graph").unwrap_or(payload),
        other => return Err(NormalizeError::Payload(format!("expected object, got {}", other))),
    };

    let graph: HeroGraph = serde_json::from_value(section.clone())
        .map_err(|e| NormalizeError::Payload(e.to_string()))?;
    Ok(graph.win_rate)
}

fn to_display_point(raw: &RawGraphPoint) -> Result<DisplayPoint, NormalizeError> {
    let date = parse_date(&raw.date)?;
    Ok(DisplayPoint {
        label: date.format("%b %-d").to_string(),
        date,
        win_rate: to_percentage(raw.win_rate, Metric::Win, &raw.date)?,
        ban_rate: to_percentage(raw.ban_rate, Metric::Ban, &raw.date)?,
        app_rate: to_percentage(raw.app_rate, Metric::Pick, &raw.date)?,
    })
}

fn parse_date(s: &str) -> Result<NaiveDate, NormalizeError> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.date_naive()))
        .map_err(|_| NormalizeError::InvalidDate(s.to_string()))
}

fn to_percentage(fraction: f64, metric: Metric, date: &str) -> Result<f64, NormalizeError> {
    if !fraction.is_finite() {
        return Err(NormalizeError::NonFiniteRate {
            metric: metric.field(),
            date: date.to_string(),
        });
    }
    Ok(round2(fraction * 100.0))
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// ── Axis scaling ────────────────────────────────────────────────

/// Y-axis bounds, whole percentage points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisDomain {
    pub min: f64,
    pub max: f64,
}

/// Padded Y-axis domain for `metric`, or `None` for an empty series.
///
/// Padding is 10% of the value range but never below 0.2 points, so a
/// flat series still gets room above and below.
pub fn axis_domain(points: &[DisplayPoint], metric: Metric) -> Option<AxisDomain> {
    let mut values = points.iter().map(|p| p.value(metric));
    let first = values.next()?;
    let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));

    let padding = ((max - min) * AXIS_PADDING_RATIO).max(AXIS_MIN_PADDING);
    Some(AxisDomain {
        min: (min - padding).floor(),
        max: (max + padding).ceil(),
    })
}

// ── Tooltip deltas ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaSign {
    Positive,
    Negative,
    Neutral,
}

impl DeltaSign {
    fn of(value: f64) -> Self {
        if value > 0.0 {
            DeltaSign::Positive
        } else if value < 0.0 {
            DeltaSign::Negative
        } else {
            DeltaSign::Neutral
        }
    }
}

/// Change of the hovered point against the point before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipDelta {
    pub label: String,
    pub metric: Metric,
    pub current: f64,
    pub previous: Option<f64>,
    /// current - previous, in percentage points
    pub absolute_change: Option<f64>,
    /// absolute_change / previous * 100; unavailable when previous is 0
    pub percentage_change: Option<f64>,
    pub absolute_sign: DeltaSign,
    pub percentage_sign: DeltaSign,
}

impl TooltipDelta {
    /// "+0.50%", "-1.20%", or "N/A" without a previous point.
    pub fn change_text(&self) -> String {
        match self.absolute_change {
            Some(change) if change > 0.0 => format!("+{:.2}%", change),
            Some(change) => format!("{:.2}%", change),
            None => "N/A".to_string(),
        }
    }

    /// "(12.34%)", or empty when unavailable.
    pub fn percentage_text(&self) -> String {
        self.percentage_change
            .map(|p| format!("({:.2}%)", p))
            .unwrap_or_default()
    }
}

/// Tooltip data for the point at `index`, or `None` if out of range.
///
/// The previous point is the one before it in the series, whatever
/// its date.
pub fn tooltip_delta(points: &[DisplayPoint], index: usize, metric: Metric) -> Option<TooltipDelta> {
    let current_point = points.get(index)?;
    let current = current_point.value(metric);
    let previous = index
        .checked_sub(1)
        .and_then(|i| points.get(i))
        .map(|p| p.value(metric));

    let absolute_change = previous.map(|prev| current - prev);
    let percentage_change = match (absolute_change, previous) {
        (Some(change), Some(prev)) if prev != 0.0 => Some(change / prev * 100.0),
        _ => None,
    };

    Some(TooltipDelta {
        label: current_point.label.clone(),
        metric,
        current,
        previous,
        absolute_change,
        percentage_change,
        absolute_sign: absolute_change.map_or(DeltaSign::Neutral, DeltaSign::of),
        percentage_sign: percentage_change.map_or(DeltaSign::Neutral, DeltaSign::of),
    })
}
