//! Static log corpora used across harnesses.
//!
//! Lines use the short-key record format (`t`, `l`, `lg`, `pid`, `tr`, `un`,
//! `tn`, `v`) plus free-form keys. `generate_lines` builds larger corpora at
//! test time for block-size and throughput checks.

/// Well-formed records covering every typed key and the special renderers.
pub const CORPUS_RECORDS: &[&str] = &[
    r#"{"t":"2024-01-01T10:00:00.123","l":"Error","lg":"WebServer","pid":"1234","args":["a","b"]}"#,
    r#"{"t":"2024-01-01T10:00:01.000","l":"Info","lg":"Scheduler","mt":"job started","tn":"acme","v":"2.4.1"}"#,
    r#"{"t":"2024-01-01T10:00:02.500","l":"Warn","lg":"Db","mt":"slow query","cust":{"ms":4200},"tr":"trace-77"}"#,
    r#"{"t":"2024-01-01T10:00:03.000","l":"Error","lg":"Payments","mt":"gateway failed","ex":{"type":"TimeoutException","m":"no reply","stack":"at Pay()\r\nat Run()"},"un":"alice","tn":"globex"}"#,
    r#"{"t":"2024-01-01T10:00:04.000","l":"Debug","lg":"Tracing","span":["req-1","GET /"],"pid":"99"}"#,
    r#"{"l":"Info","mt":"no timestamp here"}"#,
];

/// Lines that are not records; each must pass through verbatim.
pub const CORPUS_UNPARSABLE: &[&str] = &[
    "not-json",
    "2024-01-01 10:00:00 INFO plain text line",
    "[1,2,3]",
    r#"{"t":"last tuesday","mt":"bad time"}"#,
    r#"{"unterminated":"#,
    "\"just a string\"",
];

/// Mixed corpus as it appears in a real file: records, noise and blank lines.
pub const CORPUS_FILE: &[&str] = &[
    r#"{"t":"2024-03-05T08:00:00.000","l":"Info","lg":"Host","mt":"starting"}"#,
    "",
    r#"{"t":"2024-03-05T08:00:00.010","l":"Info","lg":"Host","mt":"listening","tn":"acme"}"#,
    "stray console output",
    "",
    r#"{"t":"2024-03-05T08:00:01.000","l":"Error","lg":"Host","mt":"crash","st":{"type":"Panic","m":"boom"}}"#,
];

/// `count` distinct record lines numbered from 1.
pub fn generate_lines(count: usize) -> Vec<String> {
    (1..=count)
        .map(|n| {
            format!(
                r#"{{"t":"2024-01-01T00:00:00.000","l":"Info","lg":"Gen","mt":"line {n}","pid":"{}"}}"#,
                n % 7
            )
        })
        .collect()
}

/// Join lines into file content, one per line, newline-terminated.
pub fn file_content<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}
