//! Span and trace summary types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form span attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<usize> for AttributeValue {
    fn from(v: usize) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

pub type Attributes = BTreeMap<String, AttributeValue>;

/// Build an attribute map from `(key, value)` pairs.
pub fn attrs<const N: usize>(pairs: [(&str, AttributeValue); N]) -> Attributes {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    /// Still in flight.
    Open,
    Ok,
    Error,
    /// Closed because the run was dropped before this unit of work finished.
    Cancelled,
}

impl SpanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A timestamped point of interest inside a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub attributes: Attributes,
}

/// One timed unit of work within a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub id: String,
    pub trace_id: String,
    /// `None` only for the root span of a trace.
    pub parent_id: Option<String>,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: SpanStatus,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub events: Vec<SpanEvent>,
}

impl Span {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds())
    }

    /// Characters of model output recorded on this span, if any.
    pub fn output_chars(&self) -> i64 {
        self.attributes
            .get(OUTPUT_CHARS)
            .and_then(AttributeValue::as_i64)
            .unwrap_or(0)
    }
}

/// Attribute key carrying the length of an agent's response.
pub const OUTPUT_CHARS: &str = "output.chars";

/// Rough USD price of one character of model output (about four characters
/// per token at $0.03 per 1k tokens).
pub const COST_PER_OUTPUT_CHAR: f64 = 0.03 / 4000.0;

/// Estimated spend of a set of spans, rounded to six decimals.
pub fn estimate_cost(spans: &[Span]) -> f64 {
    let chars: i64 = spans.iter().map(Span::output_chars).sum();
    let cost = chars as f64 * COST_PER_OUTPUT_CHAR;
    (cost * 1_000_000.0).round() / 1_000_000.0
}

/// Listing row for one trace, derived from its root span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSummary {
    pub trace_id: String,
    pub root_name: String,
    pub start_time: DateTime<Utc>,
    /// Root span's closed duration; `None` while the root is in flight.
    pub duration_ms: Option<i64>,
    pub span_count: usize,
    pub status: SpanStatus,
    /// Output-length based spend estimate across every span of the trace.
    #[serde(default)]
    pub estimated_cost: f64,
}

impl TraceSummary {
    /// Summarize a trace whose root is `spans[0]`; `None` for an empty trace.
    pub fn from_spans(spans: &[Span]) -> Option<Self> {
        let root = spans.first()?;
        Some(Self {
            trace_id: root.trace_id.clone(),
            root_name: root.name.clone(),
            start_time: root.start_time,
            duration_ms: root.duration_ms(),
            span_count: spans.len(),
            status: root.status,
            estimated_cost: estimate_cost(spans),
        })
    }
}
