use std::fmt;
use std::fs::DirBuilder;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Declarative configuration for the gateway listening socket.
///
/// Exactly one endpoint kind is configured per server instance. A unix
/// endpoint is addressed by filesystem path; a TCP endpoint accepts
/// connections on the given port on all interfaces.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum Endpoint {
    /// Unix domain socket bound at a filesystem path.
    Unix { path: Utf8PathBuf },
    /// TCP socket accepting connections on all interfaces.
    Tcp { port: u16 },
}

impl Endpoint {
    /// Builds a unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Builds a TCP socket endpoint.
    #[must_use]
    pub fn tcp(port: u16) -> Self {
        Self::Tcp { port }
    }

    /// Resolves an endpoint from the optional path/port pair supplied
    /// at startup.
    ///
    /// # Errors
    ///
    /// Fails when neither option is supplied, or when both are.
    pub fn from_options(
        path: Option<Utf8PathBuf>,
        port: Option<u16>,
    ) -> Result<Self, EndpointError> {
        match (path, port) {
            (Some(path), None) => Ok(Self::Unix { path }),
            (None, Some(port)) => Ok(Self::Tcp { port }),
            (None, None) => Err(EndpointError::Missing),
            (Some(_), Some(_)) => Err(EndpointError::Ambiguous),
        }
    }

    /// Returns the socket path when the endpoint uses the unix transport.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_ref()),
            Self::Tcp { .. } => None,
        }
    }

    /// Ensures the socket's parent directory exists with restrictive
    /// permissions.
    ///
    /// # Errors
    ///
    /// Fails when the path has no parent or the directory cannot be
    /// created.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Some(path) = self.unix_path() else {
            return Ok(());
        };
        let Some(parent) = path.parent() else {
            return Err(SocketPreparationError::MissingParent {
                path: path.to_path_buf(),
            });
        };

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        if let Err(source) = builder.create(parent.as_std_path())
            && source.kind() != std::io::ErrorKind::AlreadyExists
        {
            return Err(SocketPreparationError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            });
        }

        Ok(())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Tcp { port } => write!(formatter, "tcp://0.0.0.0:{port}"),
        }
    }
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        match url.scheme() {
            "unix" => {
                let path = url.path();
                if path.is_empty() {
                    return Err(EndpointParseError::MissingUnixPath(input.to_string()));
                }
                Ok(Self::unix(path))
            }
            "tcp" => {
                let port = url
                    .port()
                    .ok_or_else(|| EndpointParseError::MissingPort(input.to_string()))?;
                Ok(Self::tcp(port))
            }
            other => Err(EndpointParseError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Errors raised when resolving the endpoint configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    /// Neither a socket path nor a port was supplied.
    #[error("no listening endpoint configured: supply a socket path or a port")]
    Missing,
    /// Both a socket path and a port were supplied.
    #[error("both a socket path and a port were supplied; configure exactly one")]
    Ambiguous,
}

/// Errors encountered while parsing an [`Endpoint`] from text.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Scheme was not recognised.
    #[error("unsupported socket scheme '{0}'")]
    UnsupportedScheme(String),
    /// TCP port was missing from the address.
    #[error("missing TCP port in '{0}'")]
    MissingPort(String),
    /// Unix socket path was absent.
    #[error("missing unix socket path in '{0}'")]
    MissingUnixPath(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Errors raised when preparing socket directories.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// Parent directory is missing when creating a unix socket path.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent { path: Utf8PathBuf },
    /// Failed to create or adjust socket directories.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn from_options_requires_an_endpoint() {
        let error = Endpoint::from_options(None, None).expect_err("neither option set");
        assert_eq!(error, EndpointError::Missing);
    }

    #[test]
    fn from_options_rejects_both_endpoints() {
        let error = Endpoint::from_options(Some(Utf8PathBuf::from("/tmp/gantry.sock")), Some(9000))
            .expect_err("both options set");
        assert_eq!(error, EndpointError::Ambiguous);
    }

    #[rstest]
    #[case(Some("/tmp/gantry.sock"), None)]
    #[case(None, Some(9000))]
    fn from_options_accepts_exactly_one(#[case] path: Option<&str>, #[case] port: Option<u16>) {
        let endpoint = Endpoint::from_options(path.map(Utf8PathBuf::from), port)
            .expect("exactly one option set");
        match endpoint {
            Endpoint::Unix { path } => assert_eq!(path, "/tmp/gantry.sock"),
            Endpoint::Tcp { port } => assert_eq!(port, 9000),
        }
    }

    #[test]
    fn display_unix_socket() {
        let endpoint = Endpoint::unix(Utf8PathBuf::from("/tmp/gantry.sock"));
        assert_eq!(endpoint.to_string(), "unix:///tmp/gantry.sock");
    }

    #[test]
    fn parse_tcp_socket() {
        let endpoint: Endpoint = "tcp://0.0.0.0:9000".parse().expect("valid tcp url");
        assert!(matches!(endpoint, Endpoint::Tcp { port: 9000 }));
    }

    #[test]
    fn parse_rejects_unknown_scheme() {
        let error = "http://localhost:80"
            .parse::<Endpoint>()
            .expect_err("unsupported scheme");
        assert!(matches!(error, EndpointParseError::UnsupportedScheme(_)));
    }

    #[test]
    fn prepare_filesystem_creates_parent() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("gantry.sock");
        let path = Utf8PathBuf::from_path_buf(path).expect("utf8 path");
        let endpoint = Endpoint::unix(path.clone());
        endpoint.prepare_filesystem().expect("prepare parent");
        assert!(path.parent().expect("parent").as_std_path().is_dir());
    }
}
