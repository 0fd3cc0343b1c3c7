//! Canonical peer records merged from many observers.

use crate::normalize::CanonicalPeerView;
use overlay_peers_connection::{NodeAddress, NodePublicKey};
use serde::Serialize;
use std::collections::{btree_map, BTreeMap, BTreeSet};

/// Merged view of one network participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeerRecord {
    /// Address the peer was reported at.
    pub address: Option<NodeAddress>,
    /// Hops from the entry node, as first recorded.
    pub hops: Option<u32>,
    /// Implementation version string.
    pub version: Option<String>,
    /// Whether the peer's own crawl endpoint answered.
    pub reachable: bool,
}

/// Fields to fold into a [`PeerRecord`]. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerFields {
    pub address: Option<NodeAddress>,
    pub hops: Option<u32>,
    pub version: Option<String>,
}

impl PeerFields {
    /// Peer properties carried by a normalized link.
    ///
    /// The relation is observer-relative and is not a property of the peer.
    pub fn from_view(view: &CanonicalPeerView) -> Self {
        PeerFields {
            address: view.address.clone(),
            hops: None,
            version: view.version.clone(),
        }
    }

    /// Only a hop count.
    pub fn hops(hops: u32) -> Self {
        PeerFields {
            hops: Some(hops),
            ..Default::default()
        }
    }
}

/// Table of peer records keyed by canonical public key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PeerTable {
    records: BTreeMap<NodePublicKey, PeerRecord>,
    /// Every address each peer was reported at.
    #[serde(skip)]
    observed: BTreeMap<NodePublicKey, BTreeSet<NodeAddress>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold fields into the record for `public_key`, creating it if needed.
    ///
    /// With `is_default` set, a field that already holds a value is kept, so the
    /// first value written wins.
    pub fn merge(&mut self, public_key: &NodePublicKey, fields: PeerFields, is_default: bool) {
        let record = self.records.entry(public_key.clone()).or_default();

        if let Some(address) = fields.address {
            self.observed
                .entry(public_key.clone())
                .or_default()
                .insert(address.clone());
            if !(is_default && record.address.is_some()) {
                record.address = Some(address);
            }
        }
        if let Some(hops) = fields.hops {
            if !(is_default && record.hops.is_some()) {
                record.hops = Some(hops);
            }
        }
        if let Some(version) = fields.version {
            if !(is_default && record.version.is_some()) {
                record.version = Some(version);
            }
        }
    }

    /// Set the reachability flag of every record from a predicate on its addresses.
    ///
    /// A peer is reachable if any address it was reported at answered. When that is
    /// not the recorded address, the answering one replaces it.
    pub fn mark_reachable<F: Fn(&NodeAddress) -> bool>(&mut self, answered: F) {
        for (public_key, record) in self.records.iter_mut() {
            if record.address.as_ref().is_some_and(&answered) {
                record.reachable = true;
                continue;
            }

            let reached = self
                .observed
                .get(public_key)
                .and_then(|addresses| addresses.iter().find(|&address| answered(address)));
            match reached {
                Some(address) => {
                    record.address = Some(address.clone());
                    record.reachable = true;
                }
                None => record.reachable = false,
            }
        }
    }

    pub fn get(&self, public_key: &NodePublicKey) -> Option<&PeerRecord> {
        self.records.get(public_key)
    }

    pub fn contains(&self, public_key: &NodePublicKey) -> bool {
        self.records.contains_key(public_key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in public key order.
    pub fn iter(&self) -> btree_map::Iter<'_, NodePublicKey, PeerRecord> {
        self.records.iter()
    }

    /// Reachable records in public key order.
    pub fn reachable(&self) -> impl Iterator<Item = (&NodePublicKey, &PeerRecord)> {
        self.records.iter().filter(|(_, record)| record.reachable)
    }
}

impl<'a> IntoIterator for &'a PeerTable {
    type Item = (&'a NodePublicKey, &'a PeerRecord);
    type IntoIter = btree_map::Iter<'a, NodePublicKey, PeerRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seed: u8) -> NodePublicKey {
        let mut bytes = [seed; 33];
        bytes[0] = 0x02;
        NodePublicKey::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn test_merge_creates_record() {
        let mut table = PeerTable::new();
        table.merge(&key(1), PeerFields::default(), true);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&key(1)), Some(&PeerRecord::default()));
    }

    #[test]
    fn test_hops_first_seen_wins() {
        let mut table = PeerTable::new();
        table.merge(&key(1), PeerFields::hops(3), true);
        table.merge(&key(1), PeerFields::hops(1), true);
        table.merge(&key(1), PeerFields::hops(5), true);
        assert_eq!(table.get(&key(1)).unwrap().hops, Some(3));
    }

    #[test]
    fn test_default_merge_fills_gaps_only() {
        let mut table = PeerTable::new();
        table.merge(
            &key(2),
            PeerFields {
                version: Some("rippled-0.30.0".to_string()),
                ..Default::default()
            },
            true,
        );
        table.merge(
            &key(2),
            PeerFields {
                address: Some(NodeAddress::new("10.0.0.2", 51235)),
                version: Some("rippled-0.31.0".to_string()),
                hops: None,
            },
            true,
        );

        let record = table.get(&key(2)).unwrap();
        assert_eq!(record.version.as_deref(), Some("rippled-0.30.0"));
        assert_eq!(record.address, Some(NodeAddress::new("10.0.0.2", 51235)));
    }

    #[test]
    fn test_non_default_merge_overwrites() {
        let mut table = PeerTable::new();
        table.merge(&key(3), PeerFields::hops(4), true);
        table.merge(&key(3), PeerFields::hops(2), false);
        assert_eq!(table.get(&key(3)).unwrap().hops, Some(2));
    }

    #[test]
    fn test_mark_reachable() {
        let mut table = PeerTable::new();
        let answered = NodeAddress::new("10.0.0.1", 51235);
        table.merge(
            &key(1),
            PeerFields {
                address: Some(answered.clone()),
                ..Default::default()
            },
            true,
        );
        table.merge(&key(2), PeerFields::hops(1), true);

        table.mark_reachable(|address| *address == answered);
        assert!(table.get(&key(1)).unwrap().reachable);
        assert!(!table.get(&key(2)).unwrap().reachable);
        assert_eq!(table.reachable().count(), 1);
    }

    #[test]
    fn test_reachable_at_later_address() {
        let mut table = PeerTable::new();
        let guessed = NodeAddress::new("10.0.0.3", 51235);
        let answered = NodeAddress::new("10.0.0.3", 51236);
        for address in [&guessed, &answered] {
            table.merge(
                &key(3),
                PeerFields {
                    address: Some(address.clone()),
                    ..Default::default()
                },
                true,
            );
        }
        assert_eq!(table.get(&key(3)).unwrap().address, Some(guessed));

        table.mark_reachable(|address| *address == answered);
        let record = table.get(&key(3)).unwrap();
        assert!(record.reachable);
        assert_eq!(record.address, Some(answered));
    }
}
