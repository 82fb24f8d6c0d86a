//! Minimal `~/.ssh/config` reader for host alias resolution.
//!
//! Only the keys a log locator needs are understood: `Host`, `HostName`,
//! `User`, `Port` and `IdentityFile`. Everything else is ignored. As in
//! OpenSSH, the first value obtained for a key wins, and a host may match
//! several `Host` blocks.

use regex::Regex;
use std::path::{Path, PathBuf};

/// Settings gathered for one host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshHost {
    pub host_name: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub identity_file: Option<PathBuf>,
}

/// One word of a `Host` line, e.g. `prod-*` or `!bastion`.
#[derive(Debug, Clone)]
struct HostPattern {
    glob: Regex,
    negated: bool,
}

impl HostPattern {
    fn parse(word: &str) -> Option<Self> {
        let (negated, pattern) = match word.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, word),
        };
        Some(Self {
            glob: glob_regex(pattern)?,
            negated,
        })
    }
}

#[derive(Debug, Clone, Default)]
struct HostBlock {
    patterns: Vec<HostPattern>,
    settings: SshHost,
}

impl HostBlock {
    fn new(words: &str) -> Self {
        Self {
            patterns: words.split_whitespace().filter_map(HostPattern::parse).collect(),
            settings: SshHost::default(),
        }
    }

    fn matches(&self, alias: &str) -> bool {
        let mut matched = false;
        for pattern in &self.patterns {
            let hit = pattern.glob.is_match(alias);
            if pattern.negated && hit {
                return false;
            }
            matched |= !pattern.negated && hit;
        }
        matched
    }
}

/// Parsed host blocks, in file order.
#[derive(Debug, Clone, Default)]
pub struct SshConfig {
    blocks: Vec<HostBlock>,
}

impl SshConfig {
    /// Read `~/.ssh/config`. A missing or unreadable file yields an empty
    /// configuration.
    pub fn load() -> Self {
        let Some(home) = std::env::var_os("HOME") else {
            return Self::default();
        };
        Self::load_from(&PathBuf::from(home).join(".ssh").join("config"))
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(_) => Self::default(),
        }
    }

    pub fn parse(text: &str) -> Self {
        // Lines before the first `Host` apply to every host.
        let mut blocks = vec![HostBlock::new("*")];

        for line in text.lines() {
            let Some((key, value)) = split_directive(line) else {
                continue;
            };

            if key.eq_ignore_ascii_case("host") {
                blocks.push(HostBlock::new(value));
                continue;
            }

            let Some(current) = blocks.last_mut() else {
                continue;
            };
            let settings = &mut current.settings;
            match key.to_ascii_lowercase().as_str() {
                "hostname" => {
                    settings.host_name.get_or_insert_with(|| value.to_string());
                }
                "user" => {
                    settings.user.get_or_insert_with(|| value.to_string());
                }
                "port" => {
                    if settings.port.is_none() {
                        settings.port = value.parse().ok();
                    }
                }
                "identityfile" => {
                    settings
                        .identity_file
                        .get_or_insert_with(|| expand_home(value));
                }
                _ => {}
            }
        }

        Self { blocks }
    }

    /// Merge every block matching `alias`, first value per key winning.
    pub fn lookup(&self, alias: &str) -> SshHost {
        let mut host = SshHost::default();
        for block in self.blocks.iter().filter(|b| b.matches(alias)) {
            let s = &block.settings;
            if host.host_name.is_none() {
                host.host_name = s.host_name.clone();
            }
            if host.user.is_none() {
                host.user = s.user.clone();
            }
            if host.port.is_none() {
                host.port = s.port;
            }
            if host.identity_file.is_none() {
                host.identity_file = s.identity_file.clone();
            }
        }
        host
    }
}

fn split_directive(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let split = line.find(|c: char| c.is_whitespace() || c == '=')?;
    let (key, rest) = line.split_at(split);
    let value = rest
        .trim_start_matches(|c: char| c.is_whitespace() || c == '=')
        .trim()
        .trim_matches('"');
    (!value.is_empty()).then_some((key, value))
}

fn expand_home(value: &str) -> PathBuf {
    match (value.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(value),
    }
}

/// Anchored regex for a `Host` glob: `*` is any run of characters, `?`
/// exactly one, everything else literal.
fn glob_regex(pattern: &str) -> Option<Regex> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    let mut literal = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            _ => source.push_str(&regex::escape(c.encode_utf8(&mut literal))),
        }
    }
    source.push('$');
    Regex::new(&source).ok()
}
