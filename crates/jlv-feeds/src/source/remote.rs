//! SFTP source: reads a log file through an SSH session.
//!
//! With [`SessionPolicy::PerCycle`] every cycle connects, authenticates,
//! reads and disconnects. With [`SessionPolicy::Persistent`] one session is
//! kept between cycles and dropped by [`StreamSource::reset`] after a failed
//! cycle, so the next cycle reconnects.

use super::{LogStream, StreamSource};
use crate::error::FeedError;
use jlv_core::config::SessionPolicy;
use ssh2::{ErrorCode, Session, Sftp};
use std::io::{self, Read, Seek, SeekFrom};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// libssh2 SFTP status codes
const FX_NO_SUCH_FILE: i32 = 2;
const FX_PERMISSION_DENIED: i32 = 3;

// ---------------------------------------------------------------------------
// Endpoint and credentials
// ---------------------------------------------------------------------------

/// A fully resolved SSH endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    /// Name the user typed (an alias from `~/.ssh/config`, or the host itself).
    pub alias: String,
    /// Address actually connected to.
    pub host_name: String,
    pub port: u16,
    pub user: String,
    pub identity_file: Option<PathBuf>,
}

impl RemoteEndpoint {
    fn label(&self) -> String {
        format!("{}@{}:{}", self.user, self.host_name, self.port)
    }
}

/// How to authenticate the SSH session.
#[derive(Clone, Default)]
pub enum RemoteAuth {
    /// Keys offered by a running ssh-agent, or the endpoint's identity file
    /// when one is configured.
    #[default]
    Agent,
    Password(String),
    KeyFile {
        path: PathBuf,
        passphrase: Option<String>,
    },
}

impl std::fmt::Debug for RemoteAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteAuth::Agent => f.write_str("Agent"),
            RemoteAuth::Password(_) => f.write_str("Password(..)"),
            RemoteAuth::KeyFile { path, .. } => {
                f.debug_struct("KeyFile").field("path", path).finish_non_exhaustive()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// An authenticated session with its SFTP channel.
pub(crate) struct Connection {
    // Declared before `session` so the channel closes first.
    sftp: Sftp,
    _session: Session,
}

impl Connection {
    pub(crate) fn establish(endpoint: &RemoteEndpoint, auth: &RemoteAuth) -> Result<Self, FeedError> {
        let failed = |reason: String| FeedError::RemoteSession {
            host: endpoint.alias.clone(),
            reason,
        };

        debug!(endpoint = %endpoint.label(), "opening SSH session");

        let tcp = TcpStream::connect((endpoint.host_name.as_str(), endpoint.port))
            .map_err(|err| failed(format!("connect: {err}")))?;
        let mut session = Session::new().map_err(|err| failed(err.to_string()))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|err| failed(format!("handshake: {err}")))?;

        let user = endpoint.user.as_str();
        let result = match (auth, endpoint.identity_file.as_deref()) {
            (RemoteAuth::Password(password), _) => session.userauth_password(user, password),
            (RemoteAuth::KeyFile { path, passphrase }, _) => {
                session.userauth_pubkey_file(user, None, path, passphrase.as_deref())
            }
            (RemoteAuth::Agent, Some(identity)) => {
                session.userauth_pubkey_file(user, None, identity, None)
            }
            (RemoteAuth::Agent, None) => session.userauth_agent(user),
        };
        result.map_err(|err| failed(format!("authentication: {err}")))?;
        if !session.authenticated() {
            return Err(failed("authentication rejected".into()));
        }

        let sftp = session
            .sftp()
            .map_err(|err| failed(format!("sftp subsystem: {err}")))?;

        Ok(Self {
            sftp,
            _session: session,
        })
    }

    pub(crate) fn sftp(&self) -> &Sftp {
        &self.sftp
    }
}

/// Translate an SFTP status into the feed error taxonomy.
pub(crate) fn sftp_error(err: ssh2::Error, host: &str, path: &Path) -> FeedError {
    match err.code() {
        ErrorCode::SFTP(FX_NO_SUCH_FILE) => FeedError::NotFound(path.to_path_buf()),
        ErrorCode::SFTP(FX_PERMISSION_DENIED) => FeedError::AccessDenied(path.to_path_buf()),
        _ => FeedError::RemoteSession {
            host: host.to_string(),
            reason: err.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

pub struct RemoteSource {
    endpoint: RemoteEndpoint,
    path: PathBuf,
    auth: RemoteAuth,
    policy: SessionPolicy,
    connection: Option<Connection>,
}

impl RemoteSource {
    /// Connect once to check that the file is reachable. Under the persistent
    /// policy the session is kept for the first cycle.
    pub fn open(
        endpoint: RemoteEndpoint,
        path: impl Into<PathBuf>,
        auth: RemoteAuth,
        policy: SessionPolicy,
    ) -> Result<Self, FeedError> {
        let path = path.into();
        let connection = Connection::establish(&endpoint, &auth)?;
        let stat = connection
            .sftp()
            .stat(&path)
            .map_err(|err| sftp_error(err, &endpoint.alias, &path))?;
        if !stat.is_file() {
            return Err(FeedError::NotAFile(path));
        }

        Ok(Self {
            connection: (policy == SessionPolicy::Persistent).then_some(connection),
            endpoint,
            path,
            auth,
            policy,
        })
    }

    fn open_file(&self, connection: &Connection) -> Result<ssh2::File, FeedError> {
        connection
            .sftp()
            .open(&self.path)
            .map_err(|err| sftp_error(err, &self.endpoint.alias, &self.path))
    }
}

impl StreamSource for RemoteSource {
    fn describe(&self) -> String {
        format!("{}:{}", self.endpoint.alias, self.path.display())
    }

    fn open_stream(&mut self) -> Result<Box<dyn LogStream>, FeedError> {
        match self.policy {
            SessionPolicy::PerCycle => {
                let connection = Connection::establish(&self.endpoint, &self.auth)?;
                let file = self.open_file(&connection)?;
                Ok(Box::new(RemoteStream {
                    file,
                    _connection: Some(connection),
                }))
            }
            SessionPolicy::Persistent => {
                let connection = match self.connection.take() {
                    Some(connection) => connection,
                    None => Connection::establish(&self.endpoint, &self.auth)?,
                };
                let file = self.open_file(&connection)?;
                self.connection = Some(connection);
                Ok(Box::new(RemoteStream {
                    file,
                    _connection: None,
                }))
            }
        }
    }

    fn reset(&mut self) {
        if self.connection.take().is_some() {
            warn!(source = %self.describe(), "dropping SSH session after failed cycle");
        }
    }
}

/// A remote file handle, optionally owning the session it was opened on.
struct RemoteStream {
    file: ssh2::File,
    _connection: Option<Connection>,
}

impl Read for RemoteStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for RemoteStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl LogStream for RemoteStream {
    fn total_len(&mut self) -> io::Result<u64> {
        let stat = self.file.stat().map_err(io::Error::from)?;
        Ok(stat.size.unwrap_or(0))
    }
}
