//! Incremental reader: position-tracked reads over a seekable byte stream.
//!
//! The reader remembers how far it got (`offset`) and how long the stream was
//! at the previous cycle (`last_known_length`). A cycle:
//!
//! 1. compares the current length `L` against `last_known_length`; a shorter
//!    stream means the file was truncated or recreated, so reading restarts at
//!    byte 0 and a [`FeedEvent::Recreated`] is emitted first;
//! 2. reads lines (ended by `\n`, `\r` or `\r\n`) to end of stream, skipping
//!    empty ones, and flushes a [`LineBlock`] every `block_size` lines and
//!    once more at the end;
//! 3. stores the final stream position as the next `offset`.
//!
//! Progress of a flush is `100 * position / L` (100 for an empty stream),
//! clamped to 100 when the file grew during the cycle.

use crate::event::{FeedEvent, LineBlock, ReadSummary};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};

/// Lines per flushed block unless configured otherwise.
pub const DEFAULT_BLOCK_SIZE: usize = 500;

const READ_BUFFER_BYTES: usize = 64 * 1024;
const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ReadCursor {
    offset: u64,
    last_known_length: u64,
}

/// Owns the read cursor of one watched stream.
#[derive(Debug)]
pub struct IncrementalReader {
    cursor: ReadCursor,
    block_size: usize,
}

impl Default for IncrementalReader {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

impl IncrementalReader {
    pub fn new(block_size: usize) -> Self {
        Self {
            cursor: ReadCursor::default(),
            block_size: block_size.max(1),
        }
    }

    /// Run one read cycle over `stream`, whose current total length is `len`.
    ///
    /// Events are passed to `emit` in stream order, on the calling thread.
    /// When reading fails part-way, the cursor stops after the last flushed
    /// block so the next cycle neither skips nor repeats lines.
    pub fn read_increment<R>(
        &mut self,
        stream: &mut R,
        len: u64,
        mut emit: impl FnMut(FeedEvent),
    ) -> io::Result<ReadSummary>
    where
        R: Read + Seek + ?Sized,
    {
        let mut summary = ReadSummary::default();
        let mut start = self.cursor.offset;

        if len < self.cursor.last_known_length {
            start = 0;
            summary.recreated = true;
            emit(FeedEvent::Recreated);
        }

        stream.seek(SeekFrom::Start(start))?;

        let mut reader = BufReader::with_capacity(READ_BUFFER_BYTES, stream);
        let mut position = start;
        let mut flushed = start;
        let mut block = Vec::with_capacity(self.block_size.min(1024));
        let mut raw = Vec::new();

        loop {
            raw.clear();
            let read = match read_line(&mut reader, &mut raw) {
                Ok(read) => read,
                Err(err) => {
                    self.cursor = ReadCursor {
                        offset: flushed,
                        last_known_length: len,
                    };
                    return Err(err);
                }
            };
            if read == 0 {
                break;
            }
            let line_start = position;
            position += read as u64;

            let line = decode_line(&raw, line_start == 0);
            if line.is_empty() {
                continue;
            }
            block.push(line);

            if block.len() >= self.block_size {
                flush(&mut block, position, len, &mut summary, &mut emit);
                flushed = position;
            }
        }

        if !block.is_empty() {
            flush(&mut block, position, len, &mut summary, &mut emit);
        }

        summary.progress = progress(position, len);
        self.cursor = ReadCursor {
            offset: position,
            last_known_length: len,
        };

        Ok(summary)
    }
}

fn flush(
    block: &mut Vec<String>,
    position: u64,
    len: u64,
    summary: &mut ReadSummary,
    emit: &mut impl FnMut(FeedEvent),
) {
    let progress = progress(position, len);
    summary.lines += block.len();
    summary.blocks += 1;
    emit(FeedEvent::Block(LineBlock {
        lines: std::mem::take(block),
        progress,
    }));
}

fn progress(position: u64, len: u64) -> f64 {
    if len == 0 {
        return 100.0;
    }
    (100.0 * position as f64 / len as f64).min(100.0)
}

/// Read one line into `raw`, without its terminator. A line ends at `\n`,
/// `\r` or `\r\n`. Returns the bytes consumed, terminator included; 0 at
/// end of stream.
fn read_line<R: BufRead + ?Sized>(reader: &mut R, raw: &mut Vec<u8>) -> io::Result<usize> {
    let mut consumed = 0;
    loop {
        let (terminator, used) = {
            let available = match reader.fill_buf() {
                Ok(available) => available,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            if available.is_empty() {
                return Ok(consumed);
            }
            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(at) => {
                    raw.extend_from_slice(&available[..at]);
                    (Some(available[at]), at + 1)
                }
                None => {
                    raw.extend_from_slice(available);
                    (None, available.len())
                }
            }
        };
        reader.consume(used);
        consumed += used;

        match terminator {
            Some(b'\r') => {
                if reader.fill_buf()?.first() == Some(&b'\n') {
                    reader.consume(1);
                    consumed += 1;
                }
                return Ok(consumed);
            }
            Some(_) => return Ok(consumed),
            None => {}
        }
    }
}

fn decode_line(raw: &[u8], at_stream_start: bool) -> String {
    let line = String::from_utf8_lossy(raw);
    match line.strip_prefix(UTF8_BOM) {
        Some(rest) if at_stream_start => rest.to_string(),
        _ => line.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn read(reader: &mut IncrementalReader, data: &[u8]) -> (ReadSummary, Vec<FeedEvent>) {
        let mut events = Vec::new();
        let summary = reader
            .read_increment(&mut Cursor::new(data), data.len() as u64, |e| events.push(e))
            .unwrap();
        (summary, events)
    }

    fn lines(events: &[FeedEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                FeedEvent::Block(block) => Some(block.lines.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    #[test]
    fn second_cycle_only_sees_appended_lines() {
        let mut reader = IncrementalReader::default();
        let (_, first) = read(&mut reader, b"a\nb\n");
        assert_eq!(lines(&first), ["a", "b"]);

        let (summary, second) = read(&mut reader, b"a\nb\nc\n");
        assert_eq!(lines(&second), ["c"]);
        assert!(!summary.recreated);
        assert_eq!(reader.cursor.offset, 6);
    }

    #[test]
    fn shrinking_stream_restarts_at_zero() {
        let mut reader = IncrementalReader::default();
        read(&mut reader, b"first\nsecond\n");

        let (summary, events) = read(&mut reader, b"new\n");
        assert!(summary.recreated);
        assert!(matches!(events.first(), Some(FeedEvent::Recreated)));
        assert_eq!(lines(&events), ["new"]);
    }

    #[test]
    fn empty_lines_and_crlf_are_dropped() {
        let mut reader = IncrementalReader::default();
        let (summary, events) = read(&mut reader, b"a\r\n\r\n\nb");
        assert_eq!(lines(&events), ["a", "b"]);
        assert_eq!(summary.lines, 2);
        assert_eq!(summary.blocks, 1);
    }

    #[test]
    fn bare_cr_ends_a_line() {
        let mut reader = IncrementalReader::default();
        let (summary, events) = read(&mut reader, b"a\rb\r\nc\n\rd");
        assert_eq!(lines(&events), ["a", "b", "c", "d"]);
        assert_eq!(reader.cursor.offset, 9);
        assert_eq!(summary.progress, 100.0);
    }

    #[test]
    fn crlf_split_across_buffer_refills_is_one_break() {
        let data = b"a\r\nb\n";
        let mut reader = BufReader::with_capacity(2, Cursor::new(&data[..]));
        let mut raw = Vec::new();

        assert_eq!(read_line(&mut reader, &mut raw).unwrap(), 3);
        assert_eq!(raw, b"a");
        raw.clear();
        assert_eq!(read_line(&mut reader, &mut raw).unwrap(), 2);
        assert_eq!(raw, b"b");
        raw.clear();
        assert_eq!(read_line(&mut reader, &mut raw).unwrap(), 0);
    }

    /// Serves `data` but fails every read once `fail_at` bytes were handed out.
    struct FailingAfter {
        inner: Cursor<&'static [u8]>,
        fail_at: u64,
    }

    impl Read for FailingAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let remaining = self.fail_at.saturating_sub(self.inner.position());
            if remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "boom"));
            }
            let limit = buf.len().min(remaining as usize);
            self.inner.read(&mut buf[..limit])
        }
    }

    impl Seek for FailingAfter {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn failed_read_resumes_after_last_flushed_block() {
        const DATA: &[u8] = b"1\n2\n3\n4\n5\n";
        let mut reader = IncrementalReader::new(2);

        let mut first = Vec::new();
        let mut failing = FailingAfter {
            inner: Cursor::new(DATA),
            fail_at: 7,
        };
        let err = reader
            .read_increment(&mut failing, DATA.len() as u64, |e| first.push(e))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(lines(&first), ["1", "2"]);
        assert_eq!(reader.cursor.offset, 4);

        let (summary, second) = read(&mut reader, DATA);
        assert!(!summary.recreated);
        assert_eq!(lines(&second), ["3", "4", "5"]);

        let delivered: Vec<_> = lines(&first).into_iter().chain(lines(&second)).collect();
        assert_eq!(delivered, ["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn blocks_flush_at_block_size() {
        let mut reader = IncrementalReader::new(2);
        let (summary, events) = read(&mut reader, b"1\n2\n3\n4\n5\n");
        let sizes: Vec<_> = events
            .iter()
            .map(|e| match e {
                FeedEvent::Block(block) => block.lines.len(),
                _ => 0,
            })
            .collect();
        assert_eq!(sizes, [2, 2, 1]);
        assert_eq!(summary.blocks, 3);
        assert_eq!(summary.progress, 100.0);
    }

    #[test]
    fn empty_stream_reports_full_progress() {
        let mut reader = IncrementalReader::default();
        let (summary, events) = read(&mut reader, b"");
        assert!(events.is_empty());
        assert_eq!(summary.progress, 100.0);
    }

    #[test]
    fn leading_bom_is_stripped() {
        let mut reader = IncrementalReader::default();
        let (_, events) = read(&mut reader, "\u{feff}{\"l\":\"Info\"}\n".as_bytes());
        assert_eq!(lines(&events), ["{\"l\":\"Info\"}"]);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let mut reader = IncrementalReader::default();
        let (_, events) = read(&mut reader, b"ok \xff\n");
        assert_eq!(lines(&events), ["ok \u{fffd}"]);
    }
}
