//! In-memory stream source for watcher and scheduler tests.
//!
//! `MemorySource` serves a shared byte buffer that the test can append to,
//! replace, or make fail. Clones share the same state, so a test keeps one
//! clone as a control handle and gives the other to the watcher.

use jlv_feeds::{FeedError, LogStream, StreamSource};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Shared {
    content: Mutex<Vec<u8>>,
    /// Number of upcoming `open_stream` calls that fail.
    failures: AtomicUsize,
    opens: AtomicUsize,
    resets: AtomicUsize,
    /// Artificial latency per open, to widen race windows.
    delay: Mutex<Option<Duration>>,
}

#[derive(Clone, Default)]
pub struct MemorySource {
    shared: Arc<Shared>,
}

impl MemorySource {
    pub fn new(content: &str) -> Self {
        let source = Self::default();
        source.replace(content);
        source
    }

    pub fn append(&self, text: &str) {
        self.shared
            .content
            .lock()
            .unwrap()
            .extend_from_slice(text.as_bytes());
    }

    pub fn replace(&self, text: &str) {
        *self.shared.content.lock().unwrap() = text.as_bytes().to_vec();
    }

    pub fn fail_next(&self, count: usize) {
        self.shared.failures.store(count, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.shared.delay.lock().unwrap() = Some(delay);
    }

    pub fn opens(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.shared.resets.load(Ordering::SeqCst)
    }

    pub fn boxed(&self) -> Box<dyn StreamSource> {
        Box::new(self.clone())
    }
}

impl StreamSource for MemorySource {
    fn describe(&self) -> String {
        "memory".into()
    }

    fn open_stream(&mut self) -> Result<Box<dyn LogStream>, FeedError> {
        self.shared.opens.fetch_add(1, Ordering::SeqCst);

        let delay = *self.shared.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let pending = self.shared.failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.shared.failures.store(pending - 1, Ordering::SeqCst);
            return Err(FeedError::RemoteSession {
                host: "memory".into(),
                reason: "injected failure".into(),
            });
        }

        let snapshot = self.shared.content.lock().unwrap().clone();
        Ok(Box::new(Cursor::new(snapshot)))
    }

    fn reset(&mut self) {
        self.shared.resets.fetch_add(1, Ordering::SeqCst);
    }
}
