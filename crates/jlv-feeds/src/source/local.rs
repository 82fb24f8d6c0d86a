//! Local file source: opens the file afresh on every cycle.
//!
//! Holding no handle between cycles means an external rotation (rename +
//! create, or truncate) is always observed by the next cycle.

use super::{LogStream, StreamSource};
use crate::error::FeedError;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalSource {
    path: PathBuf,
}

impl LocalSource {
    /// Check the path is a regular file that can be opened and build a
    /// source for it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FeedError> {
        let path = path.into();
        let file = File::open(&path).map_err(|err| FeedError::from_io(err, &path))?;
        let metadata = file.metadata().map_err(|err| FeedError::from_io(err, &path))?;
        if !metadata.is_file() {
            return Err(FeedError::NotAFile(path));
        }
        Ok(Self { path })
    }
}

impl StreamSource for LocalSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn open_stream(&mut self) -> Result<Box<dyn LogStream>, FeedError> {
        let file = File::open(&self.path).map_err(|err| FeedError::from_io(err, &self.path))?;
        Ok(Box::new(file))
    }

    fn notify_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

impl LogStream for File {
    fn total_len(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}
