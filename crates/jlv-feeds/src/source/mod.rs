//! Byte stream suppliers for the incremental reader.
//!
//! A [`StreamSource`] hands out one [`LogStream`] per read cycle. The reader
//! algorithm is the same for every source; only how the bytes are reached
//! differs.

pub mod local;
pub mod remote;

pub use local::LocalSource;
pub use remote::{RemoteAuth, RemoteSource};

use crate::error::FeedError;
use std::io::{self, Read, Seek};

/// A seekable stream whose total length can be queried.
pub trait LogStream: Read + Seek + Send {
    fn total_len(&mut self) -> io::Result<u64>;
}

/// Supplies a fresh stream for each read cycle.
pub trait StreamSource: Send {
    /// Human-readable name of the watched file, used in logs and errors.
    fn describe(&self) -> String;

    /// Open a stream positioned anywhere; the reader seeks it itself.
    fn open_stream(&mut self) -> Result<Box<dyn LogStream>, FeedError>;

    /// Drop any state kept across cycles after a failed cycle.
    fn reset(&mut self) {}

    /// Local path to subscribe to for change notifications, if any.
    fn notify_path(&self) -> Option<&std::path::Path> {
        None
    }
}

impl<T> LogStream for io::Cursor<T>
where
    T: AsRef<[u8]> + Send,
{
    fn total_len(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().as_ref().len() as u64)
    }
}
