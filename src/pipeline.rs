//! Record pipeline: turns a watcher's events into numbered, filtered records.
//!
//! Records are numbered before filtering, so `seq` always reflects the
//! position within the stream even when most records are hidden.

use jlv_core::{Converter, LogRecord, RecordFilter};
use jlv_feeds::FeedEvent;
use std::collections::BTreeSet;

/// What a consumer should do after one event.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineUpdate {
    /// The stream restarted; drop everything shown so far.
    Reset,
    /// Newly converted records that passed the filter.
    Records {
        records: Vec<LogRecord>,
        progress: f64,
    },
    /// A read cycle failed; the watcher retries on its next trigger.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct RecordPipeline {
    converter: Converter,
    filter: RecordFilter,
    next_seq: u64,
    tenants: BTreeSet<String>,
}

impl Default for RecordPipeline {
    fn default() -> Self {
        Self::new(Converter::default(), RecordFilter::default())
    }
}

impl RecordPipeline {
    pub fn new(converter: Converter, filter: RecordFilter) -> Self {
        Self {
            converter,
            filter,
            next_seq: 1,
            tenants: BTreeSet::new(),
        }
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Number of records seen since the last reset, filtered or not.
    pub fn seen(&self) -> u64 {
        self.next_seq - 1
    }

    /// Distinct non-empty tenants seen since the last reset, sorted.
    pub fn tenants(&self) -> impl Iterator<Item = &str> {
        self.tenants.iter().map(String::as_str)
    }

    pub fn apply(&mut self, event: FeedEvent) -> PipelineUpdate {
        match event {
            FeedEvent::Recreated => {
                self.next_seq = 1;
                self.tenants.clear();
                PipelineUpdate::Reset
            }
            FeedEvent::Failed(reason) => PipelineUpdate::Failed(reason),
            FeedEvent::Block(block) => {
                let mut records = self.converter.convert_batch(&block.lines);
                for record in &mut records {
                    record.seq = self.next_seq;
                    self.next_seq += 1;
                    if !record.tenant.is_empty() && !self.tenants.contains(&record.tenant) {
                        self.tenants.insert(record.tenant.clone());
                    }
                }
                records.retain(|record| self.filter.matches(record));
                PipelineUpdate::Records {
                    records,
                    progress: block.progress,
                }
            }
        }
    }
}
