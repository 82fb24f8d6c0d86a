//! Record converter: raw JSON log line ⇄ [`LogRecord`].
//!
//! A raw line is a flat JSON object using short keys. Every key is first
//! rendered to a string (see below), empty renderings are dropped, and then
//! the well-known keys are extracted into typed attributes:
//!
//! | Key   | Attribute   |
//! |-------|-------------|
//! | `pid` | `pid`       |
//! | `tr`  | `trace`     |
//! | `t`   | `time`      |
//! | `l`   | `level`     |
//! | `lg`  | `logger`    |
//! | `un`  | `user_name` |
//! | `tn`  | `tenant`    |
//! | `v`   | `version`   |
//!
//! What remains, in the line's own key order, is passed through the
//! [`ColumnLayout`] to build `full_message`.
//!
//! # Rendering
//!
//! - `st` / `ex`: `"\n" + type [+ ": " + m] [+ "\n   " + stack]`
//! - `args`: `(a, b)`
//! - `cust`: `[a, b]`
//! - `span`: `Span(a, b)`
//! - anything else: values joined with `", "`, line breaks removed
//!
//! Conversion never fails: a line that is not a JSON object, or whose `t`
//! cannot be parsed, becomes [`LogRecord::raw`].

use crate::format::ColumnLayout;
use crate::types::LogRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use serde_json::Value;
use std::sync::OnceLock;

/// Timestamp layout of the `t` column in exported lines.
pub const EXPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Exported in the `t` column of records without a timestamp.
pub const UNKNOWN_TIME: &str = "0001-01-01 00:00:00.000";

const NAIVE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S%.f",
];

#[derive(Debug, thiserror::Error)]
enum ParseError {
    #[error("not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("unparsable timestamp {0:?}")]
    Time(String),
}

/// Converts raw lines using a particular [`ColumnLayout`].
#[derive(Debug, Clone, Default)]
pub struct Converter {
    layout: ColumnLayout,
}

impl Converter {
    pub fn new(layout: ColumnLayout) -> Self {
        Self { layout }
    }

    /// Shared converter using the built-in layout.
    pub fn standard() -> &'static Converter {
        static STANDARD: OnceLock<Converter> = OnceLock::new();
        STANDARD.get_or_init(Converter::default)
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// Convert one raw line. Never fails; see [`LogRecord::raw`].
    pub fn convert(&self, raw: &str) -> LogRecord {
        self.try_convert(raw)
            .unwrap_or_else(|_| LogRecord::raw(raw))
    }

    /// Convert a batch of lines in parallel. The output is index-aligned with
    /// the input.
    pub fn convert_batch<S>(&self, lines: &[S]) -> Vec<LogRecord>
    where
        S: AsRef<str> + Sync,
    {
        lines
            .par_iter()
            .map(|line| self.convert(line.as_ref()))
            .collect()
    }

    /// Render a record back into one columnar line
    /// (`t l lg mt [tn] [v] [un] [pid] [tr]`).
    pub fn export_line(&self, record: &LogRecord) -> String {
        self.layout.format(to_export_mapping(record))
    }

    fn try_convert(&self, raw: &str) -> Result<LogRecord, ParseError> {
        let Value::Object(object) = serde_json::from_str::<Value>(raw)? else {
            return Err(ParseError::NotAnObject);
        };

        let mut fields: Vec<(String, String)> = object
            .iter()
            .map(|(key, value)| (key.clone(), render(key, value)))
            .filter(|(_, rendered)| !rendered.is_empty())
            .collect();

        let mut record = LogRecord {
            pid: take(&mut fields, "pid"),
            trace: take(&mut fields, "tr"),
            ..LogRecord::default()
        };

        let time = take(&mut fields, "t");
        if !time.is_empty() {
            record.time = Some(parse_time(&time).ok_or(ParseError::Time(time))?);
        }

        record.level = take(&mut fields, "l");
        record.logger = take(&mut fields, "lg");
        record.user_name = take(&mut fields, "un");
        record.tenant = take(&mut fields, "tn");
        record.version = take(&mut fields, "v");
        record.set_full_message(self.layout.format(fields));

        Ok(record)
    }
}

/// Convert one raw line with the built-in layout.
pub fn convert(raw: &str) -> LogRecord {
    Converter::standard().convert(raw)
}

/// Convert a batch of raw lines with the built-in layout.
pub fn convert_batch<S>(lines: &[S]) -> Vec<LogRecord>
where
    S: AsRef<str> + Sync,
{
    Converter::standard().convert_batch(lines)
}

/// Project a record onto the export columns.
///
/// `t`, `l`, `lg` and `mt` are always present; an unknown time is
/// [`UNKNOWN_TIME`], unknown text columns are empty. `tn`, `v`, `un`, `pid`
/// and `tr` appear only when non-empty.
pub fn to_export_mapping(record: &LogRecord) -> Vec<(&'static str, String)> {
    let time = record
        .time
        .map(|time| time.format(EXPORT_TIME_FORMAT).to_string())
        .unwrap_or_else(|| UNKNOWN_TIME.to_string());

    let mut fields = vec![
        ("t", time),
        ("l", record.level.clone()),
        ("lg", record.logger.clone()),
        ("mt", record.full_message.clone()),
    ];

    let optional = [
        ("tn", &record.tenant),
        ("v", &record.version),
        ("un", &record.user_name),
        ("pid", &record.pid),
        ("tr", &record.trace),
    ];
    fields.extend(
        optional
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key, value.clone())),
    );

    fields
}

/// Parse the timestamp formats seen in the wild. Values carrying an offset are
/// normalised to UTC.
pub fn parse_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Some(time.naive_utc());
    }

    NAIVE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn take(fields: &mut Vec<(String, String)>, key: &str) -> String {
    match fields.iter().position(|(name, _)| name == key) {
        Some(index) => fields.remove(index).1,
        None => String::new(),
    }
}

fn render(key: &str, value: &Value) -> String {
    match key {
        "st" | "ex" => render_exception(value),
        "args" => join_values(value, "(", ")"),
        "cust" => join_values(value, "[", "]"),
        "span" => join_values(value, "Span(", ")"),
        _ => join_values(value, "", ""),
    }
}

fn join_values(value: &Value, prefix: &str, postfix: &str) -> String {
    let joined = tokens(value)
        .iter()
        .map(|token| token.replace(['\n', '\r'], ""))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{prefix}{joined}{postfix}")
}

fn render_exception(value: &Value) -> String {
    let member = |name: &str| {
        value
            .as_object()
            .and_then(|members| members.get(name))
            .map(token_text)
            .filter(|text| !text.is_empty())
    };

    let mut out = String::from("\n");

    match member("type") {
        Some(kind) => out.push_str(&kind),
        None => out.push_str(&tokens(value).join("\n")),
    }

    if let Some(message) = member("m") {
        out.push_str(": ");
        out.push_str(&message);
    }

    if let Some(stack) = member("stack") {
        out.push_str("\n   ");
        out.push_str(&stack.replace("\r\n", "\n"));
    }

    out
}

/// The values a key contributes: a scalar contributes itself, an array its
/// elements, an object its members as `"key": value`.
fn tokens(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(token_text).collect(),
        Value::Object(members) => members
            .iter()
            .map(|(name, member)| format!("\"{name}\": {member}"))
            .collect(),
        scalar => vec![token_text(scalar)],
    }
}

fn token_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
