//! Crawl endpoint payloads.
//!
//! Only the fields the crawler interprets are typed. Everything else a node reports
//! is kept in `extra` maps so a response can be re-serialized without loss.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Relation a node reports for one of its active peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// The peer connected to the observer.
    Inbound,
    /// The observer connected to the peer.
    Outbound,
    /// Direction is not known.
    Ambiguous,
}

impl Relation {
    /// Parse a wire relation value.
    ///
    /// Unrecognized values are not a hint at all and yield `None`.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "in" => Some(Relation::Inbound),
            "out" => Some(Relation::Outbound),
            "peer" => Some(Relation::Ambiguous),
            _ => None,
        }
    }

    /// The wire spelling of this relation.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Relation::Inbound => "in",
            Relation::Outbound => "out",
            Relation::Ambiguous => "peer",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// One entry of a node's active peer list, exactly as reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Public key in whatever encoding the observer used.
    pub public_key: String,
    /// Relation hint (`in`, `out`, `peer`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    /// Address of the peer, with or without a port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Implementation version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawObservation {
    /// Create an observation with only a public key set.
    pub fn new<S: Into<String>>(public_key: S) -> Self {
        RawObservation {
            public_key: public_key.into(),
            relation: None,
            ip: None,
            version: None,
            extra: Map::new(),
        }
    }

    /// Returns the observation with a relation hint.
    pub fn with_relation<S: Into<String>>(mut self, relation: S) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// Returns the observation with an address.
    pub fn with_ip<S: Into<String>>(mut self, ip: S) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Returns the observation with a version string.
    pub fn with_version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// The `overlay` section of a crawl response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    /// Currently connected peers.
    pub active: Vec<RawObservation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a node's `/crawl` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlResponse {
    pub overlay: Overlay,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CrawlResponse {
    /// Create a response reporting the given active peers.
    pub fn with_active(active: Vec<RawObservation>) -> Self {
        CrawlResponse {
            overlay: Overlay {
                active,
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    /// Parse a response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}
