//! Trace store — records one span tree per workflow run.
//!
//! # Architecture
//!
//! - `Span` — a named, timed unit of work with a parent link and attributes
//! - `TraceStore` — in-memory, lock-protected span index with query helpers
//! - `SpanGuard` — owns an open span and closes it as cancelled on drop
//! - `SpanWriter` — optional JSONL sink for closed spans
//! - `SpanReader` — reassembles traces from that sink
//!
//! Optional storage: `<trace_dir>/{day}/spans-{datetime}.jsonl`

mod reader;
mod store;
mod types;
mod writer;

pub use reader::*;
pub use store::*;
pub use types::*;
pub use writer::*;
