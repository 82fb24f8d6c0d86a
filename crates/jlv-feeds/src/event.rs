//! Events a watcher delivers to its consumer.
//!
//! For one watcher, events arrive strictly in stream order and never
//! concurrently: a cycle's [`FeedEvent::Recreated`] precedes its blocks, and
//! blocks of one cycle precede those of the next.

/// A bounded batch of consecutive non-empty lines.
#[derive(Debug, Clone, PartialEq)]
pub struct LineBlock {
    pub lines: Vec<String>,
    /// How far into the stream this block ends, in percent (0–100).
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// The file shrank since the previous cycle; reading restarted at byte 0.
    /// Consumers should drop anything accumulated from this stream.
    Recreated,
    /// New lines.
    Block(LineBlock),
    /// A triggered cycle failed. The next trigger re-attempts it.
    Failed(String),
}

/// Outcome of one read cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReadSummary {
    pub recreated: bool,
    /// Lines delivered by this cycle.
    pub lines: usize,
    /// Blocks delivered by this cycle.
    pub blocks: usize,
    /// Stream position reached, in percent of the length seen at cycle start.
    pub progress: f64,
}
