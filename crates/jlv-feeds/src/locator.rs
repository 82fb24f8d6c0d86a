//! Where a log file lives: a local path or a path on an SSH host.
//!
//! Accepted forms:
//!
//! ```text
//! /var/log/app/service.log           local path (anything not matching below)
//! sftp://[user@]host[:port]/path     explicit SFTP URL
//! [user@]host:/path                  scp-style
//! ```
//!
//! Remote hosts may be aliases; [`RemoteTarget::resolve`] applies the
//! matching `~/.ssh/config` entries.

use crate::error::LocatorError;
use crate::source::remote::RemoteEndpoint;
use crate::ssh_config::SshConfig;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

fn sftp_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^sftp://(?:(?P<user>[^@/]+)@)?(?P<host>[^:/]+)(?::(?P<port>[^/]*))?(?P<path>/.*)$")
            .expect("valid sftp locator regex")
    })
}

fn scp_style() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Hosts of one character are drive letters (`C:/logs`), not hosts.
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?P<user>[^@/:\\]+)@)?(?P<host>[^@:/\\]{2,}):(?P<path>/.*)$")
            .expect("valid scp locator regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Local(PathBuf),
    Remote(RemoteTarget),
}

/// A remote location as typed, before ssh config resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub path: String,
}

impl Locator {
    pub fn parse(input: &str) -> Result<Self, LocatorError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(LocatorError::Empty);
        }

        if let Some(caps) = sftp_url().captures(input) {
            let port = match caps.name("port").map(|m| m.as_str()) {
                None | Some("") => None,
                Some(text) => Some(
                    text.parse::<u16>()
                        .map_err(|_| LocatorError::Port(input.to_string()))?,
                ),
            };
            return Ok(Locator::Remote(RemoteTarget {
                host: caps["host"].to_string(),
                port,
                user: caps.name("user").map(|m| m.as_str().to_string()),
                path: caps["path"].to_string(),
            }));
        }

        if let Some(caps) = scp_style().captures(input) {
            return Ok(Locator::Remote(RemoteTarget {
                host: caps["host"].to_string(),
                port: None,
                user: caps.name("user").map(|m| m.as_str().to_string()),
                path: caps["path"].to_string(),
            }));
        }

        Ok(Locator::Local(PathBuf::from(input)))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Locator::Remote(_))
    }
}

impl std::str::FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locator::parse(s)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Local(path) => write!(f, "{}", path.display()),
            Locator::Remote(target) => {
                f.write_str("sftp://")?;
                if let Some(user) = &target.user {
                    write!(f, "{user}@")?;
                }
                f.write_str(&target.host)?;
                if let Some(port) = target.port {
                    write!(f, ":{port}")?;
                }
                f.write_str(&target.path)
            }
        }
    }
}

impl RemoteTarget {
    /// Fill in host name, user, port and identity from ssh config. Explicit
    /// values in the locator take precedence; the user falls back to `$USER`.
    pub fn resolve(&self, ssh: &SshConfig, default_port: u16) -> Result<RemoteEndpoint, LocatorError> {
        let entry = ssh.lookup(&self.host);

        let user = self
            .user
            .clone()
            .or(entry.user)
            .or_else(|| std::env::var("USER").ok().filter(|u| !u.is_empty()))
            .ok_or_else(|| LocatorError::MissingUser(self.host.clone()))?;

        Ok(RemoteEndpoint {
            alias: self.host.clone(),
            host_name: entry.host_name.unwrap_or_else(|| self.host.clone()),
            port: self.port.or(entry.port).unwrap_or(default_port),
            user,
            identity_file: entry.identity_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn remote(host: &str, port: Option<u16>, user: Option<&str>, path: &str) -> Locator {
        Locator::Remote(RemoteTarget {
            host: host.into(),
            port,
            user: user.map(Into::into),
            path: path.into(),
        })
    }

    #[rstest]
    #[case("/var/log/app.log", Locator::Local("/var/log/app.log".into()))]
    #[case("logs/app.log", Locator::Local("logs/app.log".into()))]
    #[case("C:/logs/app.log", Locator::Local("C:/logs/app.log".into()))]
    #[case("sftp://web01/var/log/app.log", remote("web01", None, None, "/var/log/app.log"))]
    #[case(
        "sftp://deploy@web01:2222/var/log/app.log",
        remote("web01", Some(2222), Some("deploy"), "/var/log/app.log")
    )]
    #[case("deploy@web01:/srv/log/x.log", remote("web01", None, Some("deploy"), "/srv/log/x.log"))]
    #[case("web01:/srv/log/x.log", remote("web01", None, None, "/srv/log/x.log"))]
    fn parses_locators(#[case] input: &str, #[case] expected: Locator) {
        let parsed = Locator::parse(input).unwrap();
        assert_eq!(parsed.is_remote(), matches!(expected, Locator::Remote(_)));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(matches!(
            Locator::parse("sftp://web01:99999/x.log"),
            Err(LocatorError::Port(_))
        ));
    }

    #[test]
    fn empty_locator_is_rejected() {
        assert!(matches!(Locator::parse("  "), Err(LocatorError::Empty)));
    }

    #[test]
    fn display_round_trips_remote_form() {
        let text = "sftp://deploy@web01:2222/var/log/app.log";
        assert_eq!(Locator::parse(text).unwrap().to_string(), text);
    }

    #[test]
    fn resolve_applies_ssh_config() {
        let ssh = SshConfig::parse("Host prod\n  HostName 10.1.2.3\n  User svc\n  Port 2022\n");
        let Locator::Remote(target) = Locator::parse("prod:/var/log/a.log").unwrap() else {
            panic!("expected remote locator");
        };

        let endpoint = target.resolve(&ssh, 22).unwrap();
        assert_eq!(endpoint.alias, "prod");
        assert_eq!(endpoint.host_name, "10.1.2.3");
        assert_eq!(endpoint.user, "svc");
        assert_eq!(endpoint.port, 2022);
    }

    #[test]
    fn explicit_values_beat_ssh_config() {
        let ssh = SshConfig::parse("Host prod\n  User svc\n  Port 2022\n");
        let Locator::Remote(target) = Locator::parse("sftp://me@prod:2200/a.log").unwrap() else {
            panic!("expected remote locator");
        };

        let endpoint = target.resolve(&ssh, 22).unwrap();
        assert_eq!(endpoint.user, "me");
        assert_eq!(endpoint.port, 2200);
        assert_eq!(endpoint.host_name, "prod");
    }
}
