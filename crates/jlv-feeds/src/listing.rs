//! Discover `*.log` files in a local or remote directory.

use crate::error::FeedError;
use crate::source::remote::{sftp_error, Connection, RemoteAuth, RemoteEndpoint};
use std::path::{Path, PathBuf};
use tracing::debug;

const LOG_EXTENSION: &str = "log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

fn is_log_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(LOG_EXTENSION))
}

fn sorted(mut entries: Vec<LogFileEntry>) -> Vec<LogFileEntry> {
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// List log files directly inside `dir`, sorted by name.
pub fn list_local(dir: &Path) -> Result<Vec<LogFileEntry>, FeedError> {
    let read_dir = std::fs::read_dir(dir).map_err(|err| FeedError::from_io(err, dir))?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|err| FeedError::from_io(err, dir))?;
        let path = entry.path();
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !meta.is_file() || !is_log_file(&path) {
            continue;
        }
        entries.push(LogFileEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            size: meta.len(),
        });
    }

    debug!(dir = %dir.display(), count = entries.len(), "listed local log files");
    Ok(sorted(entries))
}

/// List log files in a remote directory over SFTP, sorted by name.
pub fn list_remote(
    endpoint: &RemoteEndpoint,
    auth: &RemoteAuth,
    dir: &Path,
) -> Result<Vec<LogFileEntry>, FeedError> {
    let connection = Connection::establish(endpoint, auth)?;
    let listing = connection
        .sftp()
        .readdir(dir)
        .map_err(|err| sftp_error(err, &endpoint.alias, dir))?;

    let entries: Vec<_> = listing
        .into_iter()
        .filter(|(path, stat)| stat.is_file() && is_log_file(path))
        .filter_map(|(path, stat)| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            Some(LogFileEntry {
                name,
                size: stat.size.unwrap_or(0),
                path,
            })
        })
        .collect();

    debug!(host = %endpoint.alias, dir = %dir.display(), count = entries.len(), "listed remote log files");
    Ok(sorted(entries))
}
