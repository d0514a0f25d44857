//! Indexing and query progress reporting.
//!
//! The indexer and [`RagEngine`](crate::rag::RagEngine) emit
//! [`ProgressEvent`]s through a [`ProgressReporter`] so a UI can render
//! what is happening. The CLI prints them on **stderr** so stdout remains
//! parseable for scripts; embedders forward them into a channel with
//! [`ChannelProgress`] or handle them in a closure.

use std::io::Write;

use quill_core::models::{IndexProgress, SimilarityResult};
use serde::Serialize;
use tokio::sync::mpsc;

/// A single progress event.
///
/// A query moves through `ReadingInputs → Indexing* → Querying →
/// QueryingDone`. `Idle` resets the display, emitted when a query fails.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "kebab-case")]
pub enum ProgressEvent {
    ReadingInputs,
    Indexing { progress: IndexProgress },
    Querying,
    QueryingDone { results: Vec<SimilarityResult> },
    Idle,
}

/// Receives progress events. Must be cheap and must not block.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Human-friendly progress on stderr: "indexing  1,234 / 5,000 chunks (12 files)".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::ReadingInputs => "reading inputs...\n".to_string(),
            ProgressEvent::Indexing { progress } => format!(
                "indexing  {} / {} chunks ({} files)\n",
                format_number(progress.completed_chunks as u64),
                format_number(progress.total_chunks as u64),
                format_number(progress.total_files as u64)
            ),
            ProgressEvent::Querying => "querying...\n".to_string(),
            ProgressEvent::QueryingDone { results } => {
                format!("done  {} results\n", format_number(results.len() as u64))
            }
            ProgressEvent::Idle => return,
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::QueryingDone { results } => serde_json::json!({
                "event": "progress",
                "phase": "querying-done",
                "results": results.len(),
            }),
            other => {
                let mut value = serde_json::to_value(other).unwrap_or_default();
                if let Some(map) = value.as_object_mut() {
                    map.insert("event".into(), "progress".into());
                }
                value
            }
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Forwards events into an unbounded channel, turning them into a stream.
///
/// Events sent after the receiver is dropped are discarded.
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressReporter for ChannelProgress {
    fn report(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn event_json_shape() {
        let event = ProgressEvent::Indexing {
            progress: IndexProgress {
                completed_chunks: 3,
                total_chunks: 10,
                total_files: 2,
            },
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({
                "phase": "indexing",
                "progress": { "completedChunks": 3, "totalChunks": 10, "totalFiles": 2 }
            })
        );
        assert_eq!(
            serde_json::to_value(ProgressEvent::ReadingInputs).unwrap(),
            serde_json::json!({ "phase": "reading-inputs" })
        );
    }

    #[tokio::test]
    async fn channel_progress_streams_events() {
        let (reporter, mut rx) = ChannelProgress::new();
        reporter.report(ProgressEvent::Querying);
        reporter.report(ProgressEvent::Idle);
        drop(reporter);
        assert_eq!(rx.recv().await, Some(ProgressEvent::Querying));
        assert_eq!(rx.recv().await, Some(ProgressEvent::Idle));
        assert_eq!(rx.recv().await, None);
    }
}
