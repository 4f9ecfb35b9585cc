//! SpanWriter — JSONL append-only sink for closed spans.
//!
//! Storage path: `<trace_dir>/{day}/spans-{datetime}.jsonl`
//!
//! Spans are handed over through an unbounded channel so the trace store can
//! submit from synchronous code (including `Drop`). A background task owns
//! the file, creates directories on demand, and rotates daily. Write
//! failures are logged and never reach the workflow that produced the span.

use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

use super::types::Span;

#[derive(Debug, thiserror::Error)]
pub enum SpanWriteError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("No async runtime available to run the span writer")]
    NoRuntime,
}

enum WriterMessage {
    Span(Span),
    /// Acknowledged once everything queued before it has been written.
    Flush(oneshot::Sender<()>),
}

/// Handle to the background JSONL writer.
#[derive(Clone)]
pub struct SpanWriter {
    base_dir: PathBuf,
    tx: mpsc::UnboundedSender<WriterMessage>,
}

impl SpanWriter {
    /// Start the writer task on the current tokio runtime.
    pub fn spawn(base_dir: impl AsRef<Path>) -> Result<Self, SpanWriteError> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|_| SpanWriteError::NoRuntime)?;
        let base_dir = base_dir.as_ref().to_path_buf();
        let (tx, rx) = mpsc::unbounded_channel();

        handle.spawn(run_writer(base_dir.clone(), rx));
        tracing::info!("[SpanWriter] Appending spans under {}", base_dir.display());

        Ok(Self { base_dir, tx })
    }

    /// Queue a closed span for writing.
    pub fn submit(&self, span: &Span) {
        if self.tx.send(WriterMessage::Span(span.clone())).is_err() {
            tracing::warn!("[SpanWriter] Writer task is gone; dropping span {}", span.id);
        }
    }

    /// Wait until every span submitted so far is on disk.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(WriterMessage::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

struct CurrentFile {
    /// YYYY-MM-DD, for rotation
    date: String,
    path: PathBuf,
}

async fn run_writer(base_dir: PathBuf, mut rx: mpsc::UnboundedReceiver<WriterMessage>) {
    let mut current: Option<CurrentFile> = None;
    while let Some(message) = rx.recv().await {
        match message {
            WriterMessage::Span(span) => {
                if let Err(e) = append(&base_dir, &mut current, &span).await {
                    tracing::warn!("[SpanWriter] Failed to write span {}: {}", span.id, e);
                }
            }
            WriterMessage::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

async fn append(
    base_dir: &Path,
    current: &mut Option<CurrentFile>,
    span: &Span,
) -> Result<(), SpanWriteError> {
    let today = Local::now().format("%Y-%m-%d").to_string();
    let file_path = file_path_for(base_dir, current, &today).await?;

    let json =
        serde_json::to_string(span).map_err(|e| SpanWriteError::Serialization(e.to_string()))?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&file_path)
        .await
        .map_err(|e| SpanWriteError::Io(e.to_string()))?;
    file.write_all(format!("{}\n", json).as_bytes())
        .await
        .map_err(|e| SpanWriteError::Io(e.to_string()))?;
    file.flush()
        .await
        .map_err(|e| SpanWriteError::Io(e.to_string()))?;
    Ok(())
}

async fn file_path_for(
    base_dir: &Path,
    current: &mut Option<CurrentFile>,
    date: &str,
) -> Result<PathBuf, SpanWriteError> {
    if let Some(cf) = current {
        if cf.date == date {
            return Ok(cf.path.clone());
        }
    }

    let day_dir = base_dir.join(date);
    fs::create_dir_all(&day_dir)
        .await
        .map_err(|e| SpanWriteError::Io(format!("Failed to create trace dir: {}", e)))?;

    let datetime = Utc::now().format("%Y%m%d-%H%M%S").to_string();
    let path = day_dir.join(format!("spans-{}.jsonl", datetime));
    *current = Some(CurrentFile {
        date: date.to_string(),
        path: path.clone(),
    });
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::store::TraceStore;
    use crate::trace::types::Attributes;

    async fn read_all_lines(dir: &Path) -> Vec<String> {
        let mut lines = Vec::new();
        let mut days = fs::read_dir(dir).await.unwrap();
        while let Some(day) = days.next_entry().await.unwrap() {
            let mut files = fs::read_dir(day.path()).await.unwrap();
            while let Some(file) = files.next_entry().await.unwrap() {
                let content = fs::read_to_string(file.path()).await.unwrap();
                lines.extend(content.lines().map(String::from));
            }
        }
        lines
    }

    #[tokio::test]
    async fn test_closed_spans_are_appended_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SpanWriter::spawn(dir.path()).unwrap();
        let store = TraceStore::with_writer(writer.clone());

        let root = store.start_root("sequential-workflow", Attributes::new()).unwrap();
        let child = root.child("Writer", Attributes::new()).unwrap();
        child.finish_ok(Attributes::new()).unwrap();
        root.finish_ok(Attributes::new()).unwrap();

        writer.flush().await;
        let lines = read_all_lines(dir.path()).await;
        assert_eq!(lines.len(), 2);
        let first: Span = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first.name, "Writer");
        assert!(first.end_time.is_some());
    }

    #[test]
    fn test_spawn_without_runtime_fails() {
        assert!(matches!(
            SpanWriter::spawn("/tmp/unused"),
            Err(SpanWriteError::NoRuntime)
        ));
    }
}
