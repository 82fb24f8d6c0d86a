//! Watcher: one tailed log file.
//!
//! # Lifecycle
//!
//! ```text
//! open ──► Open ──start_periodic──► Watching
//!            │                         │
//!            └────────dispose──────────┴──► Closed
//! ```
//!
//! `read_increment` works in `Open` and `Watching`; in `Closed` every
//! operation fails with [`FeedError::Closed`]. All reads, whichever trigger
//! started them, serialize on one per-watcher mutex, and events go out on an
//! unbounded channel in stream order.

use crate::cursor::IncrementalReader;
use crate::error::{FeedError, LocatorError};
use crate::event::{FeedEvent, ReadSummary};
use crate::locator::Locator;
use crate::source::{LocalSource, RemoteAuth, RemoteSource, StreamSource};
use crate::ssh_config::SshConfig;
use crate::trigger::{self, TriggerHandle};
use jlv_core::config::{Config, SessionPolicy, TriggerMode};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Settings a watcher is built with.
#[derive(Debug, Clone)]
pub struct TailConfig {
    pub block_size: usize,
    pub trigger: TriggerMode,
    pub session: SessionPolicy,
    pub default_port: u16,
    pub auth: RemoteAuth,
    pub ssh: SshConfig,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self::from_config(&Config::defaults())
    }
}

impl TailConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            block_size: config.tail.block_size,
            trigger: config.tail.trigger,
            session: config.remote.session,
            default_port: config.remote.port,
            auth: RemoteAuth::default(),
            ssh: SshConfig::default(),
        }
    }

    pub fn with_auth(mut self, auth: RemoteAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_ssh_config(mut self, ssh: SshConfig) -> Self {
        self.ssh = ssh;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_trigger(mut self, trigger: TriggerMode) -> Self {
        self.trigger = trigger;
        self
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct ReadState {
    /// `None` once disposed.
    source: Option<Box<dyn StreamSource>>,
    reader: IncrementalReader,
}

/// State shared between the handle and its scheduler task.
pub(crate) struct Inner {
    name: String,
    state: Mutex<ReadState>,
    closed: AtomicBool,
    events: UnboundedSender<FeedEvent>,
    notify_path: Option<PathBuf>,
}

impl Inner {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn send(&self, event: FeedEvent) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.events.send(event);
    }

    pub(crate) fn report_failure(&self, err: &FeedError) {
        self.send(FeedEvent::Failed(err.to_string()));
    }

    /// One read cycle under the per-watcher lock.
    pub(crate) fn read_cycle(&self) -> Result<ReadSummary, FeedError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if self.closed.load(Ordering::Acquire) {
            return Err(FeedError::Closed);
        }

        let ReadState { source, reader } = &mut *state;
        let Some(source) = source.as_mut() else {
            return Err(FeedError::Closed);
        };

        match Self::cycle(source.as_mut(), reader, &self.events) {
            Ok(summary) => {
                if summary.recreated {
                    info!(file = %self.name, "log file was truncated or recreated; reading from start");
                }
                debug!(
                    file = %self.name,
                    lines = summary.lines,
                    blocks = summary.blocks,
                    progress = summary.progress,
                    "read cycle finished"
                );
                Ok(summary)
            }
            Err(err) => {
                source.reset();
                warn!(file = %self.name, error = %err, "read cycle failed");
                Err(err)
            }
        }
    }

    fn cycle(
        source: &mut dyn StreamSource,
        reader: &mut IncrementalReader,
        events: &UnboundedSender<FeedEvent>,
    ) -> Result<ReadSummary, FeedError> {
        let mut stream = source.open_stream()?;
        let io_error = |err| FeedError::from_io(err, source.describe());

        let len = stream.total_len().map_err(io_error)?;
        reader
            .read_increment(&mut *stream, len, |event| {
                let _ = events.send(event);
            })
            .map_err(io_error)
    }
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

/// Handle to one tailed file. Dropping it disposes it.
pub struct Watcher {
    inner: Arc<Inner>,
    trigger_mode: TriggerMode,
    trigger: Mutex<Option<TriggerHandle>>,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("name", &self.inner.name)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Open a watcher for `locator`. The file must exist and be readable
    /// (for remote files this connects once). No data is read yet.
    pub fn open(
        locator: &Locator,
        config: &TailConfig,
    ) -> Result<(Self, UnboundedReceiver<FeedEvent>), FeedError> {
        let source: Box<dyn StreamSource> = match locator {
            Locator::Local(path) => Box::new(LocalSource::open(path)?),
            Locator::Remote(target) => {
                let endpoint = target
                    .resolve(&config.ssh, config.default_port)
                    .map_err(|err| locator_error(&target.host, err))?;
                Box::new(RemoteSource::open(
                    endpoint,
                    &target.path,
                    config.auth.clone(),
                    config.session,
                )?)
            }
        };
        Ok(Self::with_source(source, config))
    }

    /// Build a watcher over any stream source.
    pub fn with_source(
        source: Box<dyn StreamSource>,
        config: &TailConfig,
    ) -> (Self, UnboundedReceiver<FeedEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let name = source.describe();
        let notify_path = source.notify_path().map(ToOwned::to_owned);

        debug!(file = %name, block_size = config.block_size, "watcher opened");

        let inner = Arc::new(Inner {
            name,
            state: Mutex::new(ReadState {
                source: Some(source),
                reader: IncrementalReader::new(config.block_size),
            }),
            closed: AtomicBool::new(false),
            events,
            notify_path,
        });

        let watcher = Self {
            inner,
            trigger_mode: config.trigger,
            trigger: Mutex::new(None),
        };
        (watcher, rx)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn is_watching(&self) -> bool {
        self.trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Read whatever was appended since the previous cycle. Blocks the
    /// calling thread; waits for a scheduler-triggered cycle in progress.
    pub fn read_increment(&self) -> Result<ReadSummary, FeedError> {
        self.inner.read_cycle()
    }

    /// Start triggering read cycles every `interval`, plus on file change
    /// notifications when the watcher was configured for them and the file
    /// is local. Must be called from within a tokio runtime.
    pub fn start_periodic(&self, interval: Duration) -> Result<(), FeedError> {
        let mut slot = self.trigger.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_closed() {
            return Err(FeedError::Closed);
        }
        if slot.is_some() {
            return Err(FeedError::AlreadyWatching);
        }

        let runtime = Handle::try_current().map_err(|_| FeedError::NoRuntime)?;
        let notify_path = match self.trigger_mode {
            TriggerMode::PollAndNotify => self.inner.notify_path.as_deref(),
            TriggerMode::Poll => None,
        };

        let handle = trigger::spawn(&runtime, Arc::clone(&self.inner), interval, notify_path)?;
        *slot = Some(handle);

        info!(
            file = %self.inner.name,
            interval_ms = interval.as_millis() as u64,
            notify = notify_path.is_some(),
            "watching"
        );
        Ok(())
    }

    /// Stop triggering and release the source. Idempotent. Returns once any
    /// read in progress has finished; no read starts afterwards.
    pub fn dispose(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(handle) = self
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.cancel();
        }

        let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.source = None;
        drop(state);

        info!(file = %self.inner.name, "watcher disposed");
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn locator_error(host: &str, err: LocatorError) -> FeedError {
    FeedError::RemoteSession {
        host: host.to_string(),
        reason: err.to_string(),
    }
}
