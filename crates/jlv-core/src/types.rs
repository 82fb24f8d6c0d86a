//! Core types for jlv-core.
//!
//! This module defines the canonical [`LogRecord`] shared by the converter,
//! the record filter and every consumer of converted lines.

use chrono::NaiveDateTime;
use serde::Serialize;

/// A canonical log record produced by the converter from one raw line.
///
/// Every contextual attribute is an empty string when the source line did not
/// carry it. `seq` is left at `0` by the converter; the consumer numbering the
/// stream assigns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    /// 1-based position within the source stream (0 = not numbered yet).
    pub seq: u64,
    /// Timestamp parsed from the `t` key, if present.
    pub time: Option<NaiveDateTime>,
    /// Free-form severity (`Error`, `Info`, …).
    pub level: String,
    /// Originating component name.
    pub logger: String,
    /// First line of `full_message`, used for compact display.
    pub message: String,
    /// Complete rendered free text. May span several lines when the record
    /// carries an exception or a stack trace.
    pub full_message: String,
    pub user_name: String,
    pub tenant: String,
    pub version: String,
    pub pid: String,
    pub trace: String,
}

impl LogRecord {
    /// The passthrough record for a line that could not be parsed: the raw
    /// text becomes both the message and the full message.
    pub fn raw(line: &str) -> Self {
        Self {
            message: line.to_string(),
            full_message: line.to_string(),
            ..Self::default()
        }
    }

    /// Set `full_message` and derive `message` from it.
    pub fn set_full_message(&mut self, full_message: String) {
        self.message = first_line(&full_message).to_string();
        self.full_message = full_message;
    }

    /// Whether the rendered body spans more than one line.
    pub fn is_multiline(&self) -> bool {
        self.message.len() < self.full_message.len()
    }
}

/// Text up to (not including) the first `\n` or `\r`.
pub fn first_line(text: &str) -> &str {
    match text.find(['\n', '\r']) {
        Some(end) => &text[..end],
        None => text,
    }
}
