//! Error types for the feeds crate.

use std::io;
use std::path::PathBuf;

/// Failure of a watcher operation.
///
/// `AlreadyWatching`, `Closed` and `NoRuntime` are usage errors and are never
/// retried. The remaining variants describe a failed read cycle; the next
/// trigger re-attempts it.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("log file not found: {0}")]
    NotFound(PathBuf),

    #[error("access denied: {0}")]
    AccessDenied(PathBuf),

    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("remote session to {host} failed: {reason}")]
    RemoteSession { host: String, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("log file already watching")]
    AlreadyWatching,

    #[error("watcher is closed")]
    Closed,

    #[error("periodic watching requires a tokio runtime")]
    NoRuntime,

    #[error("file change notifications unavailable: {0}")]
    Notify(#[from] notify::Error),
}

impl FeedError {
    /// Classify an I/O error raised while accessing `path`.
    pub fn from_io(err: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => FeedError::NotFound(path),
            io::ErrorKind::PermissionDenied => FeedError::AccessDenied(path),
            _ => FeedError::Io { path, source: err },
        }
    }

    /// Whether the error is a failed cycle (as opposed to misuse of the API).
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            FeedError::AlreadyWatching | FeedError::Closed | FeedError::NoRuntime
        )
    }
}

/// A string that could not be turned into a [`Locator`](crate::Locator).
#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    #[error("empty locator")]
    Empty,

    #[error("invalid port in {0:?}")]
    Port(String),

    #[error("no user for remote host {0}; pass user@host or set User in ~/.ssh/config")]
    MissingUser(String),
}
