use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;

use crate::shell::CommandSink;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sink is already closed")]
    Closed,
    #[error("Command `{0}` failed with status {1}")]
    CommandFailed(String, ExitStatus),
    #[error("Command `{0}` timed out after {1:?}")]
    Timeout(String, Duration),
}

/// An append-only destination for rendered bytes.
///
/// Writes are sequential; nothing is assumed about the backing store beyond
/// that. `close` flushes and releases the destination and must be safe to call
/// more than once.
pub trait Sink {
    /// Append `bytes` to the sink.
    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError>;

    /// Flush and release the sink. Later writes fail with [`SinkError::Closed`].
    fn close(&mut self) -> Result<(), SinkError>;

    /// Human-readable description of the destination, used in log events.
    fn describe(&self) -> String;
}

/// Resolve an output target string into a sink.
///
/// - `"-"` is standard output
/// - `"|command"` pipes into `command` run through the shell
/// - anything else is a file path
pub fn open_target(target: &str) -> Box<dyn Sink> {
    if target == "-" {
        Box::new(StdoutSink::new())
    } else if let Some(command) = target.strip_prefix('|') {
        Box::new(CommandSink::new(command.trim()))
    } else {
        Box::new(FileSink::new(target))
    }
}

/// A file sink. The file is created (truncating any previous content) on the
/// first write, so a driver that never produces a page never touches the disk.
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
    closed: bool,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            closed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        if self.file.is_none() {
            self.file = Some(File::create(&self.path)?);
        }
        let file = self.file.as_mut().ok_or(SinkError::Closed)?;
        file.write_all(bytes)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.closed = true;
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            file.sync_all()?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Standard output.
#[derive(Default)]
pub struct StdoutSink {
    closed: bool,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for StdoutSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        std::io::stdout().lock().write_all(bytes)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if !self.closed {
            self.closed = true;
            std::io::stdout().lock().flush()?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "stdout".to_string()
    }
}

/// A shared in-memory sink.
///
/// Clones share the same buffer, so a caller can keep one handle to inspect
/// what a driver wrote through another.
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    bytes: Vec<u8>,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock still holds valid bytes.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Everything written so far, decoded lossily as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.state().bytes).into_owned()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

impl Sink for MemorySink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        let mut state = self.state();
        if state.closed {
            return Err(SinkError::Closed);
        }
        state.bytes.extend_from_slice(bytes);
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.state().closed = true;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_shares_buffer_between_clones() {
        let handle = MemorySink::new();
        let mut sink = handle.clone();
        sink.write(b"abc").unwrap();
        sink.write(b"def").unwrap();
        assert_eq!(handle.contents(), "abcdef");
        assert!(!handle.is_closed());
        sink.close().unwrap();
        assert!(handle.is_closed());
    }

    #[test]
    fn memory_sink_rejects_write_after_close() {
        let mut sink = MemorySink::new();
        sink.close().unwrap();
        assert!(matches!(sink.write(b"x"), Err(SinkError::Closed)));
    }

    #[test]
    fn file_sink_creates_file_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut sink = FileSink::new(&path);
        assert!(!path.exists());
        sink.write(b"hello\n").unwrap();
        sink.close().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn file_sink_close_without_write_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.txt");
        let mut sink = FileSink::new(&path);
        sink.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn file_sink_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");
        let mut sink = FileSink::new(&path);
        assert!(matches!(sink.write(b"x"), Err(SinkError::Io(_))));
    }

    #[test]
    fn open_target_resolves_kinds() {
        assert_eq!(open_target("-").describe(), "stdout");
        assert_eq!(open_target("| cat").describe(), "|cat");
        assert_eq!(open_target("report.txt").describe(), "report.txt");
    }
}
