//! jlv-feeds: incremental log file readers for jlv.
//!
//! A [`Watcher`] tails one file, local or reached over SFTP, and emits
//! [`FeedEvent`]s on an unbounded channel:
//!
//! ```text
//!  Locator ──► StreamSource ──► IncrementalReader ──► FeedEvent channel
//!   (path /      (local file,      (cursor, blocks,       (Recreated,
//!    sftp url)    SFTP file)        progress)               Block, Failed)
//!                      ▲
//!        trigger task ─┘  interval ticks + notify events, one cycle at a time
//! ```
//!
//! Conversion of the delivered lines lives in `jlv-core`.

pub mod cursor;
pub mod error;
pub mod event;
pub mod listing;
pub mod locator;
pub mod source;
pub mod ssh_config;
mod trigger;
pub mod watcher;

pub use cursor::{IncrementalReader, DEFAULT_BLOCK_SIZE};
pub use error::{FeedError, LocatorError};
pub use event::{FeedEvent, LineBlock, ReadSummary};
pub use listing::{list_local, list_remote, LogFileEntry};
pub use locator::{Locator, RemoteTarget};
pub use source::remote::RemoteEndpoint;
pub use source::{LocalSource, LogStream, RemoteAuth, RemoteSource, StreamSource};
pub use ssh_config::{SshConfig, SshHost};
pub use watcher::{TailConfig, Watcher};
