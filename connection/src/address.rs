//! Crawlable node addresses.
//!
//! Peers report each other's addresses in a loose `host[:port]` form. This module
//! normalizes those strings into a [`NodeAddress`] so two observations of the same
//! node compare equal regardless of whether the default port was spelled out.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

/// Well-known peer port of the overlay network.
pub const DEFAULT_PEER_PORT: u16 = 51235;

/// Errors that can occur while parsing a node address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The host component is missing.
    EmptyHost,
    /// The port component is not a valid port number.
    InvalidPort(String),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::EmptyHost => write!(f, "Address has an empty host"),
            AddressError::InvalidPort(port) => write!(f, "Invalid port in address: {port}"),
        }
    }
}

impl std::error::Error for AddressError {}

/// Normalized `host:port` address of a crawlable node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeAddress {
    /// Hostname or IP literal, without IPv6 brackets.
    pub host: String,
    /// Peer port, the default port if none was given.
    pub port: u16,
}

impl NodeAddress {
    /// Create an address from its parts.
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        NodeAddress {
            host: host.into(),
            port,
        }
    }

    /// Parse an address as reported by an observer.
    ///
    /// Accepts `host`, `host:port`, `[v6]:port`, `[v6]` and bare IPv6 literals.
    ///
    /// # Returns
    ///
    /// * `Ok((NodeAddress, bool))` - The normalized address and whether the port was explicit.
    /// * `Err(AddressError)` - If the host is empty or the port is not a number.
    pub fn parse_observed(raw: &str) -> Result<(Self, bool), AddressError> {
        let raw = raw.trim();

        let (host, port) = if let Some(rest) = raw.strip_prefix('[') {
            match rest.split_once(']') {
                Some((host, "")) => (host, None),
                Some((host, tail)) => match tail.strip_prefix(':') {
                    Some(port) => (host, Some(port)),
                    None => return Err(AddressError::InvalidPort(tail.to_string())),
                },
                None => (rest, None),
            }
        } else if raw.parse::<Ipv6Addr>().is_ok() {
            // Bare IPv6 literal, the colons are not a port separator.
            (raw, None)
        } else {
            match raw.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (raw, None),
            }
        };

        if host.is_empty() {
            return Err(AddressError::EmptyHost);
        }

        match port {
            Some(port) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| AddressError::InvalidPort(port.to_string()))?;
                Ok((NodeAddress::new(host, port), true))
            }
            None => Ok((NodeAddress::new(host, DEFAULT_PEER_PORT), false)),
        }
    }

    /// URL of this node's crawl endpoint.
    pub fn crawl_url(&self) -> String {
        format!("https://{self}/crawl")
    }

    fn is_ipv6(&self) -> bool {
        self.host.contains(':')
    }
}

impl FromStr for NodeAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeAddress::parse_observed(s).map(|(address, _)| address)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ipv6() {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl Serialize for NodeAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
