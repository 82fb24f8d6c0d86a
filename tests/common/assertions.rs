//! Domain-specific assertion macros and event helpers for jlv harnesses.
//!
//! These wrap `pretty_assertions` and add failure messages that say which
//! tailing or conversion invariant was violated.

use jlv_feeds::{FeedEvent, LineBlock};
use tokio::sync::mpsc::UnboundedReceiver;

// ---------------------------------------------------------------------------
// Record assertions
// ---------------------------------------------------------------------------

/// Assert that `message` is the first line of `full_message`.
///
/// ```rust
/// assert_message_is_first_line!(record);
/// ```
#[macro_export]
macro_rules! assert_message_is_first_line {
    ($record:expr) => {{
        let record: &jlv_core::LogRecord = &$record;
        let expected = record
            .full_message
            .split(['\n', '\r'])
            .next()
            .unwrap_or_default();
        if record.message != expected {
            panic!(
                "assert_message_is_first_line! failed:\n  message:      {:?}\n  full_message: {:?}",
                record.message, record.full_message
            );
        }
    }};
}

/// Assert that a raw line fell back to passthrough conversion.
#[macro_export]
macro_rules! assert_passthrough {
    ($record:expr, $raw:expr) => {{
        let record: &jlv_core::LogRecord = &$record;
        let raw: &str = $raw;
        pretty_assertions::assert_eq!(record.message, raw, "message of passthrough record");
        pretty_assertions::assert_eq!(record.full_message, raw, "full_message of passthrough record");
        pretty_assertions::assert_eq!(record.level, "", "passthrough record must have no level");
        assert!(record.time.is_none(), "passthrough record must have no time");
    }};
}

// ---------------------------------------------------------------------------
// Event helpers
// ---------------------------------------------------------------------------

/// Assert that `events` contains only blocks (no recreation, no failure).
#[macro_export]
macro_rules! assert_only_blocks {
    ($events:expr) => {{
        for event in &$events {
            if !matches!(event, jlv_feeds::FeedEvent::Block(_)) {
                panic!("assert_only_blocks! failed: unexpected event {:?}", event);
            }
        }
    }};
}

/// Everything currently queued on the channel.
pub fn drain_events(rx: &mut UnboundedReceiver<FeedEvent>) -> Vec<FeedEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn blocks(events: &[FeedEvent]) -> Vec<&LineBlock> {
    events
        .iter()
        .filter_map(|event| match event {
            FeedEvent::Block(block) => Some(block),
            _ => None,
        })
        .collect()
}

pub fn block_sizes(events: &[FeedEvent]) -> Vec<usize> {
    blocks(events).iter().map(|block| block.lines.len()).collect()
}

/// All delivered lines, flattened in order.
pub fn delivered_lines(events: &[FeedEvent]) -> Vec<String> {
    blocks(events)
        .into_iter()
        .flat_map(|block| block.lines.iter().cloned())
        .collect()
}
