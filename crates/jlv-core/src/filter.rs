//! Record filter: decides which converted records a consumer shows.
//!
//! Three independent criteria, all optional:
//!
//! - **text**: case-insensitive substring (or regex) over the full message,
//!   plus a plain substring check over trace, pid and level;
//! - **tenant**: case-insensitive equality;
//! - **level**: case-insensitive equality.
//!
//! An invalid regex matches nothing rather than failing the filter.

use crate::types::LogRecord;
use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone)]
enum TextMatch {
    /// Lowercased needle.
    Plain(String),
    /// `None` when the pattern did not compile.
    Pattern { needle: String, regex: Option<Regex> },
}

#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    text: Option<TextMatch>,
    tenant: Option<String>,
    level: Option<String>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match `text` against the record body. With `use_regex` the text is
    /// compiled as a case-insensitive pattern where `.` also matches newlines.
    pub fn text(mut self, text: &str, use_regex: bool) -> Self {
        if text.is_empty() {
            self.text = None;
            return self;
        }

        self.text = Some(if use_regex {
            let regex = RegexBuilder::new(text)
                .case_insensitive(true)
                .dot_matches_new_line(true)
                .build()
                .ok();
            TextMatch::Pattern {
                needle: text.to_lowercase(),
                regex,
            }
        } else {
            TextMatch::Plain(text.to_lowercase())
        });
        self
    }

    pub fn tenant(mut self, tenant: &str) -> Self {
        self.tenant = (!tenant.is_empty()).then(|| tenant.to_string());
        self
    }

    pub fn level(mut self, level: &str) -> Self {
        self.level = (!level.is_empty()).then(|| level.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.tenant.is_none() && self.level.is_none()
    }

    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(text) = &self.text {
            if !text_matches(text, record) {
                return false;
            }
        }

        if let Some(tenant) = &self.tenant {
            if !record.tenant.eq_ignore_ascii_case(tenant) {
                return false;
            }
        }

        match &self.level {
            Some(level) => !record.level.is_empty() && record.level.eq_ignore_ascii_case(level),
            None => true,
        }
    }
}

fn text_matches(text: &TextMatch, record: &LogRecord) -> bool {
    let (body, needle) = match text {
        TextMatch::Plain(needle) => (contains(&record.full_message, needle), needle),
        TextMatch::Pattern { regex: None, .. } => return false,
        TextMatch::Pattern {
            needle,
            regex: Some(regex),
        } => (regex.is_match(&record.full_message), needle),
    };

    body || contains(&record.trace, needle)
        || contains(&record.pid, needle)
        || contains(&record.level, needle)
}

fn contains(haystack: &str, lowercase_needle: &str) -> bool {
    !haystack.is_empty() && haystack.to_lowercase().contains(lowercase_needle)
}
