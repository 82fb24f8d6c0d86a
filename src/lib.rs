//! jlv: JSON log viewer
//!
//! Command-line tailer for structured log files, local or over SFTP. This
//! crate wires the engine crates together and exposes the consumer side as
//! public modules so that integration tests can import them directly.
//!
//! # Architecture
//!
//! ```text
//! Watcher ──► FeedEvent ──► RecordPipeline ──► OutputStyle ──► stdout
//! (jlv-feeds)               (convert, number,     (compact, export,
//!                            filter)               json)
//! ```
//!
//! Watchers run their read cycles on tokio's blocking pool and hand events to
//! the printer through an unbounded channel.

pub mod output;
pub mod pipeline;

pub use output::OutputStyle;
pub use pipeline::{PipelineUpdate, RecordPipeline};
