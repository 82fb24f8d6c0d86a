//! Trigger scheduler: drives a watcher's read cycles.
//!
//! One tokio task per watcher selects over three inputs:
//!
//! - the shutdown `watch` channel (checked first),
//! - a fixed-interval ticker,
//! - an optional capacity-1 change channel fed by a `notify` watcher.
//!
//! Each cycle runs on the blocking pool and is awaited before the next
//! select, so cycles never overlap. Change events arriving meanwhile collapse
//! into the single channel slot. The ticker is reset after every cycle, so
//! the interval is measured from the end of the previous read.

use crate::error::FeedError;
use crate::event::FeedEvent;
use crate::watcher::Inner;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Keeps a scheduler task alive. Cancelling (or dropping) it stops future
/// triggers; a cycle already running completes.
pub(crate) struct TriggerHandle {
    shutdown: watch::Sender<bool>,
    _changes: Option<RecommendedWatcher>,
}

impl TriggerHandle {
    pub(crate) fn cancel(self) {
        let _ = self.shutdown.send(true);
    }
}

pub(crate) fn spawn(
    runtime: &Handle,
    inner: Arc<Inner>,
    interval: Duration,
    notify_path: Option<&Path>,
) -> Result<TriggerHandle, FeedError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (fs_watcher, changes) = match notify_path {
        Some(path) => {
            let (watcher, rx) = watch_file(path)?;
            (Some(watcher), Some(rx))
        }
        None => (None, None),
    };

    runtime.spawn(run(inner, interval, shutdown_rx, changes));

    Ok(TriggerHandle {
        shutdown: shutdown_tx,
        _changes: fs_watcher,
    })
}

async fn run(
    inner: Arc<Inner>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut changes: Option<mpsc::Receiver<()>>,
) {
    let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the caller already had the
    // chance to read once before arming the timer.
    ticker.tick().await;

    debug!(file = %inner.name(), interval_ms = interval.as_millis() as u64, "scheduler started");

    loop {
        tokio::select! {
            biased;

            res = shutdown.changed() => {
                if res.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
            changed = next_change(&mut changes) => {
                if !changed {
                    // The notify watcher went away; keep polling.
                    changes = None;
                    continue;
                }
            }
        }

        if *shutdown.borrow() {
            break;
        }

        let cycle = Arc::clone(&inner);
        match tokio::task::spawn_blocking(move || cycle.read_cycle()).await {
            Ok(Ok(_)) => {}
            Ok(Err(FeedError::Closed)) => break,
            Ok(Err(err)) => inner.report_failure(&err),
            Err(join) => {
                warn!(file = %inner.name(), error = %join, "read cycle panicked");
                inner.send(FeedEvent::Failed(join.to_string()));
            }
        }

        ticker.reset();
    }

    debug!(file = %inner.name(), "scheduler stopped");
}

/// Resolves on the next change notification, or never when there is no
/// notification source. Yields `false` once the source is gone.
async fn next_change(changes: &mut Option<mpsc::Receiver<()>>) -> bool {
    match changes {
        Some(rx) => rx.recv().await.is_some(),
        None => std::future::pending().await,
    }
}

/// Watch the file's directory, since the file itself may be replaced.
fn watch_file(path: &Path) -> Result<(RecommendedWatcher, mpsc::Receiver<()>), FeedError> {
    let (tx, rx) = mpsc::channel::<()>(1);
    let file_name: Option<OsString> = path.file_name().map(ToOwned::to_owned);

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let relevant = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                && event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == file_name.as_deref());
            if relevant {
                // Full means a trigger is already pending.
                let _ = tx.try_send(());
            }
        }
        Err(err) => warn!(error = %err, "file change notification error"),
    })?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    watcher.watch(dir, RecursiveMode::NonRecursive)?;

    Ok((watcher, rx))
}
