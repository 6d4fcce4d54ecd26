//! Event log sinks.
//!
//! The fortress writes human-readable event lines through an injected
//! [`LogSink`]. Every line carries a local timestamp:
//!
//! ```text
//! [2024-05-01 12:00:00] Step 12: Psi=1.02, Hf=3.40, Trust=0.981, Risk=0.18
//! ```
//!
//! Sinks are best-effort. A sink that fails to write reports the failure
//! through `tracing` and drops the line.

use chrono::Local;
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Default event log file name.
pub const DEFAULT_LOG_FILE: &str = "psi_overseer_log.txt";

/// Prefix `message` with the current local timestamp.
pub fn format_line(message: &str) -> String {
    format!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message)
}

/// Destination for formatted event lines.
pub trait LogSink: Send + Sync {
    /// Record one line. `line` has no trailing newline.
    fn emit(&self, line: &str);
}

/// Appends lines to a UTF-8 text file.
#[derive(Debug, Clone)]
pub struct FileLogSink {
    path: PathBuf,
}

impl FileLogSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")
    }
}

impl Default for FileLogSink {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_FILE)
    }
}

impl LogSink for FileLogSink {
    fn emit(&self, line: &str) {
        if let Err(e) = self.append(line) {
            warn!(path = %self.path.display(), error = %e, "event log write failed");
        }
    }
}

/// Keeps the most recent lines in memory.
///
/// Clones share the same buffer, so one clone can be handed to the
/// fortress while another is read by a dashboard.
#[derive(Debug, Clone)]
pub struct MemoryLogSink {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl MemoryLogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of the buffered lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.iter().cloned().collect()
    }

    /// The last `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        let skip = lines.len().saturating_sub(n);
        lines.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryLogSink {
    fn default() -> Self {
        Self::new(500)
    }
}

impl LogSink for MemoryLogSink {
    fn emit(&self, line: &str) {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.push_back(line.to_string());
        while lines.len() > self.capacity {
            lines.pop_front();
        }
    }
}

/// Forwards lines to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn emit(&self, line: &str) {
        info!(target: "psi::events", "{line}");
    }
}

/// Discards every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogSink;

impl LogSink for NullLogSink {
    fn emit(&self, _line: &str) {}
}

/// Sends each line to several sinks in order.
#[derive(Clone, Default)]
pub struct FanoutLogSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl FanoutLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl LogSink for FanoutLogSink {
    fn emit(&self, line: &str) {
        for sink in &self.sinks {
            sink.emit(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_format_has_bracketed_timestamp() {
        let line = format_line("hello");
        assert!(line.starts_with('['));
        assert!(line.ends_with("] hello"));
        // "[YYYY-MM-DD HH:MM:SS] " is 22 characters
        assert_eq!(line.len(), 22 + "hello".len());
    }

    #[test]
    fn memory_sink_evicts_oldest() {
        let sink = MemoryLogSink::new(2);
        sink.emit("a");
        sink.emit("b");
        sink.emit("c");
        assert_eq!(sink.lines(), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(sink.tail(1), vec!["c".to_string()]);
    }

    #[test]
    fn memory_sink_clones_share_buffer() {
        let sink = MemoryLogSink::new(10);
        let reader = sink.clone();
        sink.emit("shared");
        assert_eq!(reader.len(), 1);
    }

    #[test]
    fn file_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.txt");
        let sink = FileLogSink::new(&path);
        sink.emit("first");
        sink.emit("second");
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "first\nsecond\n");
    }

    #[test]
    fn file_sink_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileLogSink::new(dir.path().join("missing").join("events.txt"));
        sink.emit("dropped");
        assert!(!dir.path().join("missing").exists());
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let a = MemoryLogSink::new(4);
        let b = MemoryLogSink::new(4);
        let fanout = FanoutLogSink::new()
            .with(Arc::new(a.clone()))
            .with(Arc::new(b.clone()))
            .with(Arc::new(NullLogSink));
        fanout.emit("x");
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(fanout.len(), 3);
    }
}
