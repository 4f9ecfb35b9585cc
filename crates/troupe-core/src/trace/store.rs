//! In-memory, concurrency-safe span recorder.
//!
//! All mutations (span start, attribute set, span end) take the write lock,
//! so concurrent runs never observe a half-written span. The API is
//! synchronous so spans can be closed from `Drop`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use super::types::{AttributeValue, Attributes, Span, SpanEvent, SpanStatus, TraceSummary};
use super::writer::SpanWriter;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    #[error("Span {0} is already closed")]
    AlreadyClosed(String),

    #[error("Unknown span: {0}")]
    UnknownSpan(String),

    #[error("Unknown trace: {0}")]
    UnknownTrace(String),

    #[error("Invalid parent for trace {trace_id}: {reason}")]
    InvalidParent { trace_id: String, reason: String },

    #[error("Trace store lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Identifies a span and the trace it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpanRef {
    pub trace_id: String,
    pub span_id: String,
}

#[derive(Default)]
struct TraceIndex {
    traces: HashMap<String, TraceEntry>,
    /// span id → trace id
    span_traces: HashMap<String, String>,
    next_seq: u64,
}

struct TraceEntry {
    seq: u64,
    /// Creation order; the root is always first.
    spans: Vec<Span>,
}

impl TraceIndex {
    fn span_mut(&mut self, span_id: &str) -> Result<&mut Span, TraceError> {
        let trace_id = self
            .span_traces
            .get(span_id)
            .ok_or_else(|| TraceError::UnknownSpan(span_id.to_string()))?;
        self.traces
            .get_mut(trace_id)
            .and_then(|t| t.spans.iter_mut().find(|s| s.id == span_id))
            .ok_or_else(|| TraceError::UnknownSpan(span_id.to_string()))
    }
}

#[derive(Clone, Default)]
pub struct TraceStore {
    inner: Arc<RwLock<TraceIndex>>,
    writer: Option<SpanWriter>,
}

impl TraceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that also appends every closed span to a JSONL sink.
    pub fn with_writer(writer: SpanWriter) -> Self {
        Self {
            inner: Arc::default(),
            writer: Some(writer),
        }
    }

    /// Wait for the JSONL sink, if any, to catch up with closed spans.
    pub async fn flush(&self) {
        if let Some(writer) = &self.writer {
            writer.flush().await;
        }
    }

    /// Start a span.
    ///
    /// Without `trace_id` a new trace is allocated and the span becomes its
    /// root (a parent must not be given). With `trace_id`, `parent_id` must
    /// name a span already recorded in that trace.
    pub fn start_span(
        &self,
        trace_id: Option<&str>,
        parent_id: Option<&str>,
        name: &str,
        attributes: Attributes,
    ) -> Result<SpanRef, TraceError> {
        let mut index = self.write()?;

        let (trace_id, parent_id) = match (trace_id, parent_id) {
            (None, None) => (uuid::Uuid::new_v4().to_string(), None),
            (None, Some(parent)) => {
                return Err(TraceError::InvalidParent {
                    trace_id: String::new(),
                    reason: format!("parent {} given without a trace id", parent),
                })
            }
            (Some(trace_id), None) => {
                return Err(TraceError::InvalidParent {
                    trace_id: trace_id.to_string(),
                    reason: "only the root span may omit its parent".into(),
                })
            }
            (Some(trace_id), Some(parent)) => {
                let entry = index
                    .traces
                    .get(trace_id)
                    .ok_or_else(|| TraceError::UnknownTrace(trace_id.to_string()))?;
                if !entry.spans.iter().any(|s| s.id == parent) {
                    return Err(TraceError::InvalidParent {
                        trace_id: trace_id.to_string(),
                        reason: format!("span {} is not part of this trace", parent),
                    });
                }
                (trace_id.to_string(), Some(parent.to_string()))
            }
        };

        let span = Span {
            id: uuid::Uuid::new_v4().to_string(),
            trace_id: trace_id.clone(),
            parent_id,
            name: name.to_string(),
            start_time: Utc::now(),
            end_time: None,
            status: SpanStatus::Open,
            attributes,
            events: Vec::new(),
        };
        let span_ref = SpanRef {
            trace_id: trace_id.clone(),
            span_id: span.id.clone(),
        };

        index
            .span_traces
            .insert(span.id.clone(), trace_id.clone());
        let seq = index.next_seq;
        index.next_seq += 1;
        index
            .traces
            .entry(trace_id)
            .or_insert_with(|| TraceEntry {
                seq,
                spans: Vec::new(),
            })
            .spans
            .push(span);

        Ok(span_ref)
    }

    /// Start the root span of a new trace, returning a guard that closes it.
    pub fn start_root(&self, name: &str, attributes: Attributes) -> Result<SpanGuard, TraceError> {
        let span = self.start_span(None, None, name, attributes)?;
        Ok(SpanGuard::new(self.clone(), span))
    }

    /// Start a child of `parent`, returning a guard that closes it.
    pub fn start_child(
        &self,
        parent: &SpanRef,
        name: &str,
        attributes: Attributes,
    ) -> Result<SpanGuard, TraceError> {
        let span = self.start_span(
            Some(&parent.trace_id),
            Some(&parent.span_id),
            name,
            attributes,
        )?;
        Ok(SpanGuard::new(self.clone(), span))
    }

    /// Set one attribute on a span that is still open.
    pub fn set_attribute(
        &self,
        span_id: &str,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Result<(), TraceError> {
        let mut index = self.write()?;
        let span = index.span_mut(span_id)?;
        if !span.is_open() {
            return Err(TraceError::AlreadyClosed(span_id.to_string()));
        }
        span.attributes.insert(key.into(), value.into());
        Ok(())
    }

    /// Append a timestamped event to a span that is still open.
    pub fn add_event(
        &self,
        span_id: &str,
        name: &str,
        attributes: Attributes,
    ) -> Result<(), TraceError> {
        let mut index = self.write()?;
        let span = index.span_mut(span_id)?;
        if !span.is_open() {
            return Err(TraceError::AlreadyClosed(span_id.to_string()));
        }
        let timestamp = Utc::now().max(span.start_time);
        span.events.push(SpanEvent {
            name: name.to_string(),
            timestamp,
            attributes,
        });
        Ok(())
    }

    /// Close a span successfully.
    pub fn end_span(&self, span_id: &str) -> Result<Span, TraceError> {
        self.end_span_with(span_id, SpanStatus::Ok, Attributes::new())
    }

    /// Close a span with an explicit status and closing attributes.
    ///
    /// Closing twice is an error: double-close is a caller bug. The end
    /// timestamp never precedes the start timestamp.
    pub fn end_span_with(
        &self,
        span_id: &str,
        status: SpanStatus,
        attributes: Attributes,
    ) -> Result<Span, TraceError> {
        let closed = {
            let mut index = self.write()?;
            let span = index.span_mut(span_id)?;
            if !span.is_open() {
                return Err(TraceError::AlreadyClosed(span_id.to_string()));
            }
            let now = Utc::now();
            span.end_time = Some(now.max(span.start_time));
            span.status = match status {
                SpanStatus::Open => SpanStatus::Ok,
                other => other,
            };
            span.attributes.extend(attributes);
            span.clone()
        };

        if let Some(writer) = &self.writer {
            writer.submit(&closed);
        }
        Ok(closed)
    }

    pub fn get_span(&self, span_id: &str) -> Result<Option<Span>, TraceError> {
        let index = self.read()?;
        Ok(index
            .span_traces
            .get(span_id)
            .and_then(|trace_id| index.traces.get(trace_id))
            .and_then(|t| t.spans.iter().find(|s| s.id == span_id))
            .cloned())
    }

    /// All spans of a trace ordered by start time; empty for unknown ids.
    pub fn get_spans(&self, trace_id: &str) -> Result<Vec<Span>, TraceError> {
        let index = self.read()?;
        let mut spans = index
            .traces
            .get(trace_id)
            .map(|t| t.spans.clone())
            .unwrap_or_default();
        // stable: equal timestamps keep creation order, so the root stays first
        spans.sort_by_key(|s| s.start_time);
        Ok(spans)
    }

    /// Most recent traces first.
    pub fn list_recent_traces(&self, limit: usize) -> Result<Vec<TraceSummary>, TraceError> {
        let index = self.read()?;
        let mut entries: Vec<&TraceEntry> = index.traces.values().collect();
        entries.sort_by(|a, b| {
            let a_start = a.spans.first().map(|s| s.start_time);
            let b_start = b.spans.first().map(|s| s.start_time);
            b_start.cmp(&a_start).then(b.seq.cmp(&a.seq))
        });

        Ok(entries
            .into_iter()
            .filter_map(|entry| TraceSummary::from_spans(&entry.spans))
            .take(limit)
            .collect())
    }

    pub fn trace_count(&self) -> Result<usize, TraceError> {
        Ok(self.read()?.traces.len())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, TraceIndex>, TraceError> {
        self.inner
            .read()
            .map_err(|e| TraceError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, TraceIndex>, TraceError> {
        self.inner
            .write()
            .map_err(|e| TraceError::LockPoisoned(e.to_string()))
    }
}

/// Owns an open span until it is finished.
///
/// Dropping a guard whose span is still open closes it as `cancelled`; this
/// is what happens when a caller drops a workflow future mid-run or a
/// parallel worker is aborted.
pub struct SpanGuard {
    store: TraceStore,
    span: SpanRef,
    closed: bool,
}

impl SpanGuard {
    fn new(store: TraceStore, span: SpanRef) -> Self {
        Self {
            store,
            span,
            closed: false,
        }
    }

    pub fn span_ref(&self) -> &SpanRef {
        &self.span
    }

    pub fn trace_id(&self) -> &str {
        &self.span.trace_id
    }

    pub fn span_id(&self) -> &str {
        &self.span.span_id
    }

    pub fn child(&self, name: &str, attributes: Attributes) -> Result<SpanGuard, TraceError> {
        self.store.start_child(&self.span, name, attributes)
    }

    pub fn set_attribute(
        &self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Result<(), TraceError> {
        self.store.set_attribute(&self.span.span_id, key, value)
    }

    pub fn add_event(&self, name: &str, attributes: Attributes) -> Result<(), TraceError> {
        self.store.add_event(&self.span.span_id, name, attributes)
    }

    pub fn finish_ok(mut self, attributes: Attributes) -> Result<Span, TraceError> {
        self.closed = true;
        self.store
            .end_span_with(&self.span.span_id, SpanStatus::Ok, attributes)
    }

    /// Close as failed, recording `message` under the `error` attribute.
    pub fn finish_err(
        mut self,
        message: &str,
        mut attributes: Attributes,
    ) -> Result<Span, TraceError> {
        self.closed = true;
        attributes.insert("error".into(), AttributeValue::from(message));
        self.store
            .end_span_with(&self.span.span_id, SpanStatus::Error, attributes)
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let mut attributes = Attributes::new();
        attributes.insert("error".into(), AttributeValue::from("cancelled"));
        if let Err(e) =
            self.store
                .end_span_with(&self.span.span_id, SpanStatus::Cancelled, attributes)
        {
            tracing::warn!("[TraceStore] Failed to close abandoned span: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::types::{attrs, OUTPUT_CHARS};

    #[test]
    fn test_root_and_child_spans() {
        let store = TraceStore::new();
        let root = store
            .start_span(None, None, "sequential-workflow", Attributes::new())
            .unwrap();
        let child = store
            .start_span(
                Some(&root.trace_id),
                Some(&root.span_id),
                "Summarizer",
                attrs([("step", 1usize.into())]),
            )
            .unwrap();
        store.end_span(&child.span_id).unwrap();
        store.end_span(&root.span_id).unwrap();

        let spans = store.get_spans(&root.trace_id).unwrap();
        assert_eq!(spans.len(), 2);
        assert!(spans[0].is_root());
        assert_eq!(spans[1].parent_id.as_deref(), Some(root.span_id.as_str()));
        assert_eq!(spans[1].attributes["step"], AttributeValue::Int(1));
        assert!(spans.iter().all(|s| s.end_time.unwrap() >= s.start_time));
    }

    #[test]
    fn test_double_close_is_reported() {
        let store = TraceStore::new();
        let root = store
            .start_span(None, None, "root", Attributes::new())
            .unwrap();
        store.end_span(&root.span_id).unwrap();
        assert_eq!(
            store.end_span(&root.span_id),
            Err(TraceError::AlreadyClosed(root.span_id.clone()))
        );
    }

    #[test]
    fn test_child_requires_parent_in_same_trace() {
        let store = TraceStore::new();
        let a = store.start_span(None, None, "a", Attributes::new()).unwrap();
        let b = store.start_span(None, None, "b", Attributes::new()).unwrap();

        let err = store
            .start_span(Some(&a.trace_id), Some(&b.span_id), "x", Attributes::new())
            .unwrap_err();
        assert!(matches!(err, TraceError::InvalidParent { .. }));

        let err = store
            .start_span(Some("nope"), Some(&a.span_id), "x", Attributes::new())
            .unwrap_err();
        assert_eq!(err, TraceError::UnknownTrace("nope".into()));

        let err = store
            .start_span(Some(&a.trace_id), None, "second-root", Attributes::new())
            .unwrap_err();
        assert!(matches!(err, TraceError::InvalidParent { .. }));
    }

    #[test]
    fn test_unknown_trace_yields_empty_spans() {
        let store = TraceStore::new();
        assert!(store.get_spans("missing").unwrap().is_empty());
        assert!(matches!(
            store.end_span("missing"),
            Err(TraceError::UnknownSpan(_))
        ));
    }

    #[test]
    fn test_list_recent_traces_most_recent_first() {
        let store = TraceStore::new();
        let first = store.start_root("first", Attributes::new()).unwrap();
        let first_id = first.trace_id().to_string();
        first.finish_ok(Attributes::new()).unwrap();
        let second = store.start_root("second", Attributes::new()).unwrap();
        let second_id = second.trace_id().to_string();
        let _child = second.child("worker", Attributes::new()).unwrap();

        let summaries = store.list_recent_traces(10).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].trace_id, second_id);
        assert_eq!(summaries[0].span_count, 2);
        assert_eq!(summaries[0].duration_ms, None);
        assert_eq!(summaries[1].trace_id, first_id);
        assert_eq!(summaries[1].status, SpanStatus::Ok);
        assert!(summaries[1].duration_ms.is_some());

        assert_eq!(store.list_recent_traces(1).unwrap().len(), 1);
    }

    #[test]
    fn test_dropped_guard_closes_span_as_cancelled() {
        let store = TraceStore::new();
        let trace_id = {
            let root = store.start_root("run", Attributes::new()).unwrap();
            let _child = root.child("step", Attributes::new()).unwrap();
            root.trace_id().to_string()
        };
        let spans = store.get_spans(&trace_id).unwrap();
        assert_eq!(spans.len(), 2);
        for span in spans {
            assert_eq!(span.status, SpanStatus::Cancelled);
            assert!(span.end_time.is_some());
        }
    }

    #[test]
    fn test_finish_err_records_error_attribute() {
        let store = TraceStore::new();
        let root = store.start_root("run", Attributes::new()).unwrap();
        let trace_id = root.trace_id().to_string();
        root.finish_err("provider exploded", Attributes::new()).unwrap();
        let spans = store.get_spans(&trace_id).unwrap();
        assert_eq!(spans[0].status, SpanStatus::Error);
        assert_eq!(
            spans[0].attributes["error"],
            AttributeValue::from("provider exploded")
        );
    }

    #[test]
    fn test_events_are_recorded_until_the_span_closes() {
        let store = TraceStore::new();
        let root = store.start_root("run", Attributes::new()).unwrap();
        let planner = root.child("planner", Attributes::new()).unwrap();
        planner
            .add_event("decision", attrs([("next_agent_id", "a1".into())]))
            .unwrap();
        let planner_id = planner.span_id().to_string();
        planner.finish_ok(Attributes::new()).unwrap();

        let span = store.get_span(&planner_id).unwrap().unwrap();
        assert_eq!(span.events.len(), 1);
        assert_eq!(span.events[0].name, "decision");
        assert_eq!(span.events[0].attributes["next_agent_id"].as_str(), Some("a1"));
        assert!(span.events[0].timestamp >= span.start_time);

        assert_eq!(
            store.add_event(&planner_id, "late", Attributes::new()),
            Err(TraceError::AlreadyClosed(planner_id.clone()))
        );
        assert!(matches!(
            store.add_event("missing", "x", Attributes::new()),
            Err(TraceError::UnknownSpan(_))
        ));
    }

    #[test]
    fn test_summary_estimates_cost_from_output_length() {
        let store = TraceStore::new();
        let root = store.start_root("run", Attributes::new()).unwrap();
        for chars in [3000usize, 1000] {
            root.child("agent", Attributes::new())
                .unwrap()
                .finish_ok(attrs([(OUTPUT_CHARS, chars.into())]))
                .unwrap();
        }
        root.finish_ok(Attributes::new()).unwrap();

        let summary = &store.list_recent_traces(1).unwrap()[0];
        assert_eq!(summary.span_count, 3);
        assert!((summary.estimated_cost - 0.03).abs() < 1e-9);

        let idle = store.start_root("idle", Attributes::new()).unwrap();
        idle.finish_ok(Attributes::new()).unwrap();
        assert_eq!(store.list_recent_traces(1).unwrap()[0].estimated_cost, 0.0);
    }

    #[test]
    fn test_concurrent_siblings_do_not_corrupt_each_other() {
        let store = TraceStore::new();
        let root = store.start_root("parallel", Attributes::new()).unwrap();
        let parent = root.span_ref().clone();

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                let parent = parent.clone();
                std::thread::spawn(move || {
                    let span = store
                        .start_child(&parent, &format!("worker-{}", i), Attributes::new())
                        .unwrap();
                    span.set_attribute("index", i as i64).unwrap();
                    span.finish_ok(Attributes::new()).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        root.finish_ok(Attributes::new()).unwrap();

        let spans = store.get_spans(&parent.trace_id).unwrap();
        assert_eq!(spans.len(), 33);
        assert!(spans[1..]
            .iter()
            .all(|s| s.parent_id.as_deref() == Some(parent.span_id.as_str())
                && s.status == SpanStatus::Ok
                && s.attributes.contains_key("index")));
    }
}
