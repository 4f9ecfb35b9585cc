//! SpanReader — read back spans persisted by [`SpanWriter`](super::SpanWriter).
//!
//! Storage path: `<trace_dir>/{day}/spans-{datetime}.jsonl`
//!
//! Each closed span is one line, so a trace is reassembled by grouping lines
//! on `traceId`. Lines that fail to parse are skipped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::types::{Span, TraceSummary};

#[derive(Debug, thiserror::Error)]
pub enum SpanReadError {
    #[error("IO error: {0}")]
    Io(String),
}

#[derive(Debug, Clone)]
pub struct SpanReader {
    base_dir: PathBuf,
}

impl SpanReader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Spans of one trace in start-time order; empty when nothing matches.
    pub async fn get_spans(&self, trace_id: &str) -> Result<Vec<Span>, SpanReadError> {
        let mut spans: Vec<Span> = self
            .read_all()
            .await?
            .into_iter()
            .filter(|s| s.trace_id == trace_id)
            .collect();
        sort_for_display(&mut spans);
        Ok(spans)
    }

    /// Newest traces first, at most `limit`.
    pub async fn list_traces(&self, limit: usize) -> Result<Vec<TraceSummary>, SpanReadError> {
        let mut by_trace: HashMap<String, Vec<Span>> = HashMap::new();
        for span in self.read_all().await? {
            by_trace.entry(span.trace_id.clone()).or_default().push(span);
        }

        let mut summaries: Vec<TraceSummary> = by_trace
            .into_values()
            .filter_map(|mut spans| {
                sort_for_display(&mut spans);
                TraceSummary::from_spans(&spans)
            })
            .collect();
        summaries.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        summaries.truncate(limit);
        Ok(summaries)
    }

    async fn read_all(&self) -> Result<Vec<Span>, SpanReadError> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut spans = Vec::new();
        for day_dir in collect_entries(&self.base_dir, |p| p.is_dir()).await? {
            let files = collect_entries(&day_dir, |p| {
                p.is_file() && p.extension().is_some_and(|ext| ext == "jsonl")
            })
            .await?;
            for file in files {
                let content = tokio::fs::read_to_string(&file)
                    .await
                    .map_err(|e| SpanReadError::Io(format!("Failed to read {}: {}", file.display(), e)))?;
                spans.extend(
                    content
                        .lines()
                        .filter_map(|line| serde_json::from_str::<Span>(line).ok()),
                );
            }
        }
        Ok(spans)
    }
}

/// Root first, then by start time.
fn sort_for_display(spans: &mut [Span]) {
    spans.sort_by(|a, b| {
        b.is_root()
            .cmp(&a.is_root())
            .then(a.start_time.cmp(&b.start_time))
    });
}

async fn collect_entries(
    path: &Path,
    keep: impl Fn(&Path) -> bool,
) -> Result<Vec<PathBuf>, SpanReadError> {
    let mut entries = Vec::new();
    let mut readdir = tokio::fs::read_dir(path)
        .await
        .map_err(|e| SpanReadError::Io(format!("Failed to read directory: {}", e)))?;

    while let Some(entry) = readdir
        .next_entry()
        .await
        .map_err(|e| SpanReadError::Io(format!("Failed to read dir entry: {}", e)))?
    {
        let path = entry.path();
        if keep(&path) {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}
