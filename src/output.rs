//! Output styles for printed records.

use jlv_core::convert::to_export_mapping;
use jlv_core::{Converter, LogRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputStyle {
    /// Sequence number plus the columnar line, first message line only.
    #[default]
    Compact,
    /// Full columnar export line, multi-line bodies included.
    Export,
    /// One JSON object per record.
    Json,
}

impl OutputStyle {
    pub fn render(self, converter: &Converter, record: &LogRecord) -> serde_json::Result<String> {
        Ok(match self {
            OutputStyle::Compact => {
                let fields = to_export_mapping(record).into_iter().map(|(key, value)| {
                    if key == "mt" {
                        (key, record.message.clone())
                    } else {
                        (key, value)
                    }
                });
                format!("{:>7} {}", record.seq, converter.layout().format(fields))
            }
            OutputStyle::Export => converter.export_line(record),
            OutputStyle::Json => serde_json::to_string(record)?,
        })
    }
}
