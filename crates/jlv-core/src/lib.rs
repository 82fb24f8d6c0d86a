//! jlv-core: record conversion library for jlv.
//!
//! This crate turns raw structured log lines into canonical records and back
//! into columnar text. It does no I/O apart from loading configuration.
//!
//! # Pipeline
//!
//! ```text
//! raw line ──► convert ──► LogRecord ──► filter ──► consumer
//!                 │            │
//!                 ▼            ▼
//!          ColumnLayout ◄── to_export_mapping
//! ```
//!
//! Conversion is infallible and stateless; batches fan out across a rayon
//! pool.

pub mod config;
pub mod convert;
pub mod filter;
pub mod format;
pub mod types;

pub use convert::{convert, convert_batch, to_export_mapping, Converter};
pub use filter::RecordFilter;
pub use format::{format, ColumnLayout};
pub use types::LogRecord;
