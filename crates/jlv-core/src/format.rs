//! Column formatter: renders an ordered set of fields into one fixed-width
//! text line.
//!
//! # Rules
//!
//! For each field, in order:
//!
//! - a value starting with `\n` is deferred verbatim to the trailing region
//!   (exceptions and stack traces end up below the columns);
//! - a key with a configured width keeps the **last** `width` characters of a
//!   longer value, or is left-padded with spaces to `width`;
//! - a key with a configured suffix gets it appended right after the value.
//!
//! Inline fields are joined by a single space. Deferred fragments follow the
//! last inline field with no separator.
//!
//! | Key   | Width | Suffix |
//! |-------|-------|--------|
//! | `pid` | 10    |        |
//! | `l`   | 5     |        |
//! | `lg`  | 30    | `" \|"` |
//! | `tr`  | 20    |        |

use std::collections::HashMap;
use std::sync::OnceLock;

/// Per-key widths and suffixes used by [`ColumnLayout::format`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    widths: HashMap<String, usize>,
    suffixes: HashMap<String, String>,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self::new(
            [("pid", 10), ("l", 5), ("lg", 30), ("tr", 20)]
                .into_iter()
                .map(|(key, width)| (key.to_string(), width)),
            [("lg".to_string(), " |".to_string())],
        )
    }
}

impl ColumnLayout {
    pub fn new(
        widths: impl IntoIterator<Item = (String, usize)>,
        suffixes: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            widths: widths.into_iter().collect(),
            suffixes: suffixes.into_iter().collect(),
        }
    }

    /// Shared instance of the built-in layout.
    pub fn standard() -> &'static ColumnLayout {
        static STANDARD: OnceLock<ColumnLayout> = OnceLock::new();
        STANDARD.get_or_init(ColumnLayout::default)
    }

    /// Override (or add) the width of one key.
    pub fn with_width(mut self, key: impl Into<String>, width: usize) -> Self {
        self.widths.insert(key.into(), width);
        self
    }

    /// Override (or add) the suffix of one key.
    pub fn with_suffix(mut self, key: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.suffixes.insert(key.into(), suffix.into());
        self
    }

    pub fn width(&self, key: &str) -> Option<usize> {
        self.widths.get(key).copied()
    }

    /// Render `fields` into one line.
    pub fn format<K, V>(&self, fields: impl IntoIterator<Item = (K, V)>) -> String
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut line = String::new();
        let mut trailing = String::new();
        let mut first = true;

        for (key, value) in fields {
            let (key, value) = (key.as_ref(), value.as_ref());

            if value.starts_with('\n') {
                trailing.push_str(value);
                continue;
            }

            if first {
                first = false;
            } else {
                line.push(' ');
            }

            match self.widths.get(key) {
                Some(&width) => push_fixed(&mut line, value, width),
                None => line.push_str(value),
            }

            if let Some(suffix) = self.suffixes.get(key) {
                line.push_str(suffix);
            }
        }

        line.push_str(&trailing);
        line
    }
}

/// Render `fields` with the built-in layout.
pub fn format<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    ColumnLayout::standard().format(fields)
}

fn push_fixed(line: &mut String, value: &str, width: usize) {
    let len = value.chars().count();
    if len > width {
        let skip = value
            .char_indices()
            .nth(len - width)
            .map(|(index, _)| index)
            .unwrap_or(value.len());
        line.push_str(&value[skip..]);
    } else {
        line.extend(std::iter::repeat(' ').take(width - len));
        line.push_str(value);
    }
}
