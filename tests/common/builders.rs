//! Test builders: ergonomic constructors for records, watchers and log files.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use jlv_core::LogRecord;
use jlv_feeds::{FeedEvent, Locator, TailConfig, Watcher};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

// ---------------------------------------------------------------------------
// RecordBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`LogRecord`] fixtures.
///
/// ```rust
/// let record = RecordBuilder::new("timeout")
///     .level("Error")
///     .logger("Db")
///     .tenant("acme")
///     .build();
/// ```
pub struct RecordBuilder {
    record: LogRecord,
}

impl RecordBuilder {
    pub fn new(full_message: impl Into<String>) -> Self {
        let mut record = LogRecord::default();
        record.set_full_message(full_message.into());
        Self { record }
    }

    pub fn time(mut self, text: &str) -> Self {
        self.record.time = Some(
            chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                .expect("RecordBuilder::time: use YYYY-MM-DD HH:MM:SS.fff"),
        );
        self
    }

    pub fn level(mut self, level: &str) -> Self {
        self.record.level = level.into();
        self
    }

    pub fn logger(mut self, logger: &str) -> Self {
        self.record.logger = logger.into();
        self
    }

    pub fn tenant(mut self, tenant: &str) -> Self {
        self.record.tenant = tenant.into();
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.record.version = version.into();
        self
    }

    pub fn user(mut self, user: &str) -> Self {
        self.record.user_name = user.into();
        self
    }

    pub fn pid(mut self, pid: &str) -> Self {
        self.record.pid = pid.into();
        self
    }

    pub fn trace(mut self, trace: &str) -> Self {
        self.record.trace = trace.into();
        self
    }

    pub fn build(self) -> LogRecord {
        self.record
    }
}

// ---------------------------------------------------------------------------
// LogFile
// ---------------------------------------------------------------------------

/// A log file inside its own temp directory.
pub struct LogFile {
    _dir: TempDir,
    path: PathBuf,
}

impl LogFile {
    pub fn new(content: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("service.log");
        std::fs::write(&path, content).expect("write log file");
        Self { _dir: dir, path }
    }

    pub fn empty() -> Self {
        Self::new("")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn locator(&self) -> Locator {
        Locator::Local(self.path.clone())
    }

    pub fn append(&self, content: &str) {
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .expect("open for append");
        file.write_all(content.as_bytes()).expect("append");
        file.flush().expect("flush");
    }

    pub fn append_lines<S: AsRef<str>>(&self, lines: &[S]) {
        self.append(&crate::common::file_content(lines));
    }

    /// Replace the file content in place (truncate + write).
    pub fn rewrite(&self, content: &str) {
        std::fs::write(&self.path, content).expect("rewrite log file");
    }

    /// Simulate rotation: move the file away and create a fresh one.
    pub fn rotate(&self, content: &str) {
        std::fs::rename(&self.path, self.path.with_extension("log.1")).expect("rotate");
        std::fs::write(&self.path, content).expect("create rotated file");
    }

    pub fn watch(&self, config: &TailConfig) -> (Watcher, UnboundedReceiver<FeedEvent>) {
        Watcher::open(&self.locator(), config).expect("open watcher")
    }
}

/// Tail settings with a custom block size and everything else default.
pub fn tail_config(block_size: usize) -> TailConfig {
    TailConfig::default().with_block_size(block_size)
}
