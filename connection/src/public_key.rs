//! Node public key encodings.
//!
//! Nodes report their peers' public keys either in the canonical base58check form
//! (ripple alphabet, node-public version byte) or as raw base64. Everything downstream
//! keys peers by [`NodePublicKey`], which is always the canonical form.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Version byte prefixed to node public keys before base58check encoding.
pub const NODE_PUBLIC_VERSION: u8 = 28;
/// Length of a compressed node public key.
pub const NODE_PUBLIC_KEY_LEN: usize = 33;

/// Errors that can occur while canonicalizing a public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The key is neither canonical base58check nor valid base64.
    MalformedKey(String),
    /// The key decoded to the wrong number of bytes.
    InvalidLength(usize),
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::MalformedKey(raw) => write!(f, "Malformed node public key: {raw}"),
            KeyError::InvalidLength(len) => write!(
                f,
                "Node public key must be {NODE_PUBLIC_KEY_LEN} bytes, got {len}"
            ),
        }
    }
}

impl std::error::Error for KeyError {}

/// A node public key in canonical base58check encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePublicKey(String);

impl NodePublicKey {
    /// Encode raw key bytes into the canonical form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != NODE_PUBLIC_KEY_LEN {
            return Err(KeyError::InvalidLength(bytes.len()));
        }

        Ok(NodePublicKey(
            bs58::encode(bytes)
                .with_alphabet(bs58::Alphabet::RIPPLE)
                .with_check_version(NODE_PUBLIC_VERSION)
                .into_string(),
        ))
    }

    /// Canonicalize a key as reported in a peer list.
    ///
    /// Canonical keys pass through unchanged, anything else is decoded as base64
    /// and re-encoded.
    ///
    /// # Returns
    ///
    /// * `Ok(NodePublicKey)` - The canonical key.
    /// * `Err(KeyError)` - If the raw key cannot be decoded.
    pub fn canonicalize(raw: &str) -> Result<Self, KeyError> {
        if Self::is_canonical(raw) {
            return Ok(NodePublicKey(raw.to_string()));
        }

        let bytes = STANDARD
            .decode(raw)
            .map_err(|_| KeyError::MalformedKey(raw.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Check whether a string is already a canonical node public key.
    pub fn is_canonical(raw: &str) -> bool {
        match bs58::decode(raw)
            .with_alphabet(bs58::Alphabet::RIPPLE)
            .with_check(Some(NODE_PUBLIC_VERSION))
            .into_vec()
        {
            // Decoded bytes keep the version prefix.
            Ok(decoded) => decoded.len() == NODE_PUBLIC_KEY_LEN + 1,
            Err(_) => false,
        }
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for NodePublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NodePublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NodePublicKey::canonicalize(&raw).map_err(serde::de::Error::custom)
    }
}
