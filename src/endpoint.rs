//! Cluster endpoints
//!
//! An endpoint is the network address of a cluster member, written as
//! `host:port` with an optional `http://` or `https://` scheme. IPv6 hosts
//! must be bracketed (`[::1]:2379`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// URL scheme carried by an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    fn prefix(self) -> &'static str {
        match self {
            Scheme::Http => "http://",
            Scheme::Https => "https://",
        }
    }
}

/// A parsed cluster endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    scheme: Option<Scheme>,
    host: String,
    port: u16,
}

/// Reasons an endpoint string is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("endpoint is empty")]
    Empty,

    #[error("missing port (expected host:port)")]
    MissingPort,

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("missing host")]
    MissingHost,

    #[error("unbalanced brackets in host")]
    UnbalancedBrackets,

    #[error("IPv6 host '{0}' must be bracketed")]
    UnbracketedIpv6(String),

    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("unexpected path '{0}'")]
    UnexpectedPath(String),
}

impl Endpoint {
    /// Host part, without IPv6 brackets
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn scheme(&self) -> Option<Scheme> {
        self.scheme
    }

    /// `host:port` form suitable for socket address resolution
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EndpointError::Empty);
        }

        let (scheme, rest) = if let Some(rest) = s.strip_prefix("https://") {
            (Some(Scheme::Https), rest)
        } else if let Some(rest) = s.strip_prefix("http://") {
            (Some(Scheme::Http), rest)
        } else if let Some((other, _)) = s.split_once("://") {
            return Err(EndpointError::UnsupportedScheme(other.to_string()));
        } else {
            (None, s)
        };

        // etcd clients tolerate a trailing slash on URL-style endpoints
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        if let Some(idx) = rest.find('/') {
            return Err(EndpointError::UnexpectedPath(rest[idx..].to_string()));
        }

        let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
            let (host, tail) = bracketed
                .split_once(']')
                .ok_or(EndpointError::UnbalancedBrackets)?;
            let port = tail.strip_prefix(':').ok_or(EndpointError::MissingPort)?;
            (host, port)
        } else {
            if rest.contains(']') {
                return Err(EndpointError::UnbalancedBrackets);
            }
            let (host, port) = rest.rsplit_once(':').ok_or(EndpointError::MissingPort)?;
            if host.contains(':') {
                return Err(EndpointError::UnbracketedIpv6(rest.to_string()));
            }
            (host, port)
        };

        if host.is_empty() {
            return Err(EndpointError::MissingHost);
        }
        if port.is_empty() {
            return Err(EndpointError::MissingPort);
        }
        let port: u16 = port
            .parse()
            .map_err(|_| EndpointError::InvalidPort(port.to_string()))?;
        if port == 0 {
            return Err(EndpointError::InvalidPort("0".to_string()));
        }

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = self.scheme {
            f.write_str(scheme.prefix())?;
        }
        f.write_str(&self.authority())
    }
}

impl TryFrom<String> for Endpoint {
    type Error = EndpointError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

/// Split a comma-separated endpoint list, trimming whitespace and dropping
/// empty segments. Parsing is deferred to validation.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
