//! Configuration types for jlv.
//!
//! [`Config::load`] reads `~/.config/jlv/config.toml`, creating it with
//! hardcoded defaults if it does not yet exist. [`Config::defaults`] returns
//! the same defaults without touching the filesystem (useful in tests).
//!
//! The engine never reads configuration on its own; the binary loads a
//! [`Config`] once and hands the relevant sections to the watchers and the
//! converter it builds.

use crate::format::ColumnLayout;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[tail]
interval_ms = 3000
block_size  = 500
trigger     = "poll"

[remote]
session = "per_cycle"
port    = 22

[columns.widths]
pid = 10
l   = 5
lg  = 30
tr  = 20

[columns.suffixes]
lg = " |"
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level application configuration, loaded from `~/.config/jlv/config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tail: TailSettings,
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub columns: ColumnSettings,
}

/// What drives a watcher's read cycles besides explicit calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Fixed-interval timer only.
    Poll,
    /// Timer plus OS change notifications (local files only).
    PollAndNotify,
}

/// Lifetime of an SFTP session for remote watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPolicy {
    /// Connect, read and disconnect on every cycle.
    PerCycle,
    /// Keep one session open; reconnect only after a failed cycle.
    Persistent,
}

/// `[tail]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct TailSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    #[serde(default = "default_trigger")]
    pub trigger: TriggerMode,
}

fn default_interval_ms() -> u64 { 3000 }
fn default_block_size() -> usize { 500 }
fn default_trigger() -> TriggerMode { TriggerMode::Poll }

impl Default for TailSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            block_size: default_block_size(),
            trigger: default_trigger(),
        }
    }
}

impl TailSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// `[remote]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSettings {
    #[serde(default = "default_session")]
    pub session: SessionPolicy,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_session() -> SessionPolicy { SessionPolicy::PerCycle }
fn default_port() -> u16 { 22 }

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            session: default_session(),
            port: default_port(),
        }
    }
}

/// `[columns]` section of `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnSettings {
    #[serde(default)]
    pub widths: BTreeMap<String, usize>,
    #[serde(default)]
    pub suffixes: BTreeMap<String, String>,
}

impl ColumnSettings {
    /// Build the formatter layout. An empty section falls back to the
    /// built-in layout.
    pub fn layout(&self) -> ColumnLayout {
        if self.widths.is_empty() && self.suffixes.is_empty() {
            return ColumnLayout::default();
        }
        ColumnLayout::new(self.widths.clone(), self.suffixes.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load from `~/.config/jlv/config.toml`, layered on top of the built-in
    /// defaults. Creates the file with defaults if it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG.trim_start())?;
        }

        Self::load_from(&path)
    }

    /// Load an explicit file on top of the built-in defaults. A missing file
    /// yields the defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path).required(false))
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("jlv")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
