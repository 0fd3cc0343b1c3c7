//! Normalization of reported peer list entries.

use log::{debug, warn};
use overlay_peers_connection::{
    CrawlResponse, KeyError, NodeAddress, NodePublicKey, RawObservation, Relation,
};

/// A peer list entry after key canonicalization and address normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPeerView {
    /// Canonical public key of the reported peer.
    pub public_key: NodePublicKey,
    /// Normalized address, if the observer reported a usable one.
    pub address: Option<NodeAddress>,
    /// Relation as seen by the observer, after direction inference.
    pub relation: Option<Relation>,
    /// Implementation version string.
    pub version: Option<String>,
}

impl CanonicalPeerView {
    /// Normalize a single observation.
    ///
    /// A generic `peer` relation is resolved from the address: an explicit port means
    /// the observer dialed out, a missing port means the peer dialed in. Without any
    /// address the relation is kept as reported.
    ///
    /// # Returns
    ///
    /// * `Ok(CanonicalPeerView)` - The normalized view.
    /// * `Err(KeyError)` - If the public key cannot be decoded.
    pub fn from_observation(observation: &RawObservation) -> Result<Self, KeyError> {
        let public_key = NodePublicKey::canonicalize(&observation.public_key)?;
        let relation = match observation.relation.as_deref() {
            Some(raw) => {
                let relation = Relation::from_wire(raw);
                if relation.is_none() {
                    debug!("Ignoring unknown relation {raw} for {public_key}");
                }
                relation
            }
            None => None,
        };

        let parsed = match observation.ip.as_deref() {
            Some(raw) => match NodeAddress::parse_observed(raw) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    debug!("Ignoring unusable address {raw} for {public_key}: {e}");
                    None
                }
            },
            None => None,
        };

        let (address, relation) = match parsed {
            Some((address, explicit_port)) => {
                let relation = match relation {
                    Some(Relation::Ambiguous) if explicit_port => Some(Relation::Outbound),
                    Some(Relation::Ambiguous) => Some(Relation::Inbound),
                    other => other,
                };
                (Some(address), relation)
            }
            None => (None, relation),
        };

        Ok(CanonicalPeerView {
            public_key,
            address,
            relation,
            version: observation.version.clone(),
        })
    }
}

/// All usable links of one crawl response.
#[derive(Debug, Clone, Default)]
pub struct NormalizedResponse {
    /// Links that normalized successfully, in reported order.
    pub views: Vec<CanonicalPeerView>,
    /// Number of links dropped for malformed keys.
    pub malformed: usize,
}

/// Normalize every active link in a response reported by `observer`.
///
/// Links with malformed keys are dropped, the rest of the response is kept.
pub fn normalize_response(observer: &NodeAddress, response: &CrawlResponse) -> NormalizedResponse {
    let mut normalized = NormalizedResponse::default();

    for observation in &response.overlay.active {
        match CanonicalPeerView::from_observation(observation) {
            Ok(view) => normalized.views.push(view),
            Err(e) => {
                warn!("Dropping link reported by {observer}: {e}");
                normalized.malformed += 1;
            }
        }
    }

    normalized
}
