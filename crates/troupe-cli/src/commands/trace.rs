//! `troupe trace` — Inspect traces persisted to the JSONL trace directory.
//!
//! Traces live in memory for the lifetime of one process, so a separate
//! CLI invocation can only see what the span writer put on disk.

use std::collections::HashMap;
use std::path::Path;

use console::style;
use troupe_core::trace::{Span, SpanReader, SpanStatus};

use super::print_json;

const BAR_WIDTH: usize = 40;

pub async fn list(trace_dir: Option<&Path>, limit: usize) -> Result<(), String> {
    let reader = reader_for(trace_dir)?;
    let traces = reader.list_traces(limit).await.map_err(|e| e.to_string())?;
    print_json(&serde_json::json!({ "traces": traces }));
    Ok(())
}

pub async fn show(trace_dir: Option<&Path>, trace_id: &str, json: bool) -> Result<(), String> {
    let reader = reader_for(trace_dir)?;
    let spans = reader.get_spans(trace_id).await.map_err(|e| e.to_string())?;
    if spans.is_empty() {
        return Err(format!("Trace {} not found", trace_id));
    }

    if json {
        print_json(&serde_json::json!({ "traceId": trace_id, "spans": spans }));
    } else {
        print_waterfall(&spans);
    }
    Ok(())
}

fn reader_for(trace_dir: Option<&Path>) -> Result<SpanReader, String> {
    trace_dir
        .map(SpanReader::new)
        .ok_or_else(|| "No trace directory configured; pass --trace-dir or set TROUPE_TRACE_DIR".to_string())
}

/// Print spans as an indented timeline, bars positioned relative to the
/// root span.
pub fn print_waterfall(spans: &[Span]) {
    for row in waterfall_rows(spans) {
        let status = match row.status {
            SpanStatus::Ok => style("ok").green(),
            SpanStatus::Error => style("error").red(),
            SpanStatus::Cancelled => style("cancelled").yellow(),
            SpanStatus::Open => style("open").dim(),
        };
        let duration = row
            .duration_ms
            .map(|ms| format!("{}ms", ms))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<32} {} {:>8} {}",
            format!("{}{}", "  ".repeat(row.depth), row.name),
            style(row.bar()).cyan(),
            duration,
            status
        );
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaterfallRow {
    pub depth: usize,
    pub name: String,
    /// Bar start column, `0..BAR_WIDTH`.
    pub offset: usize,
    /// Bar length in columns, at least 1.
    pub width: usize,
    pub duration_ms: Option<i64>,
    pub status: SpanStatus,
}

impl WaterfallRow {
    fn bar(&self) -> String {
        let mut bar = " ".repeat(self.offset);
        bar.push_str(&"█".repeat(self.width));
        bar.push_str(&" ".repeat(BAR_WIDTH.saturating_sub(self.offset + self.width)));
        bar
    }
}

/// Lay out spans in display order. Offsets follow
/// `(span.start - root.start) / trace duration`.
pub fn waterfall_rows(spans: &[Span]) -> Vec<WaterfallRow> {
    let Some(root) = spans.iter().find(|s| s.is_root()).or(spans.first()) else {
        return Vec::new();
    };

    let trace_end = spans
        .iter()
        .filter_map(|s| s.end_time)
        .chain(std::iter::once(root.start_time))
        .max()
        .unwrap_or(root.start_time);
    let total_ms = (trace_end - root.start_time).num_milliseconds().max(1) as f64;

    let parents: HashMap<&str, Option<&str>> = spans
        .iter()
        .map(|s| (s.id.as_str(), s.parent_id.as_deref()))
        .collect();
    let depth_of = |span: &Span| {
        let mut depth = 0;
        let mut current = span.parent_id.as_deref();
        while let Some(parent) = current {
            depth += 1;
            current = parents.get(parent).copied().flatten();
            if depth > spans.len() {
                break;
            }
        }
        depth
    };

    spans
        .iter()
        .map(|span| {
            let start_ms = (span.start_time - root.start_time).num_milliseconds().max(0) as f64;
            let end = span.end_time.unwrap_or(trace_end);
            let span_ms = (end - span.start_time).num_milliseconds().max(0) as f64;

            let offset = ((start_ms / total_ms) * BAR_WIDTH as f64) as usize;
            let offset = offset.min(BAR_WIDTH - 1);
            let width = ((span_ms / total_ms) * BAR_WIDTH as f64).round() as usize;
            let width = width.clamp(1, BAR_WIDTH - offset);

            WaterfallRow {
                depth: depth_of(span),
                name: span.name.clone(),
                offset,
                width,
                duration_ms: span.duration_ms(),
                status: span.status,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use troupe_core::trace::Attributes;

    fn span(base: DateTime<Utc>, id: &str, parent: Option<&str>, start_ms: i64, end_ms: i64) -> Span {
        Span {
            id: id.to_string(),
            trace_id: "t1".to_string(),
            parent_id: parent.map(str::to_string),
            name: id.to_string(),
            start_time: base + Duration::milliseconds(start_ms),
            end_time: Some(base + Duration::milliseconds(end_ms)),
            status: SpanStatus::Ok,
            attributes: Attributes::new(),
            events: Vec::new(),
        }
    }

    #[test]
    fn test_rows_are_positioned_relative_to_root() {
        let base = Utc::now();
        let rows = waterfall_rows(&[
            span(base, "root", None, 0, 1000),
            span(base, "child", Some("root"), 500, 1000),
            span(base, "grandchild", Some("child"), 500, 750),
        ]);
        assert_eq!(rows[0].depth, 0);
        assert_eq!(rows[0].offset, 0);
        assert_eq!(rows[0].width, BAR_WIDTH);
        assert_eq!(rows[1].depth, 1);
        assert_eq!(rows[1].offset, BAR_WIDTH / 2);
        assert_eq!(rows[1].width, BAR_WIDTH / 2);
        assert_eq!(rows[2].depth, 2);
        assert_eq!(rows[2].width, BAR_WIDTH / 4);
    }

    #[test]
    fn test_zero_length_spans_still_get_a_column() {
        let rows = waterfall_rows(&[span(Utc::now(), "root", None, 0, 0)]);
        assert_eq!(rows[0].width, 1);
        assert_eq!(rows[0].bar().chars().count(), BAR_WIDTH);
    }

    #[test]
    fn test_missing_trace_dir_is_an_error() {
        let err = reader_for(None).unwrap_err();
        assert!(err.contains("TROUPE_TRACE_DIR"));
    }
}
