//! Reconstruction of the overlay connection graph.
//!
//! Every reachable peer reports its own active links, so most physical connections
//! are seen from both ends, possibly with direction known at only one of them. The
//! reconciler keeps one edge per connected pair: directed if any observer knew the
//! direction, undirected otherwise.

use crate::normalize::CanonicalPeerView;
use crate::records::PeerTable;
use log::debug;
use overlay_peers_connection::{NodeAddress, NodePublicKey, Relation};
use serde::Serialize;
use std::collections::BTreeMap;

/// A connection between two peers.
///
/// For undirected edges `from` and `to` carry no direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: NodePublicKey,
    pub to: NodePublicKey,
    pub directed: bool,
}

/// Peers and the deduplicated edges between them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Topology {
    pub peers: PeerTable,
    pub edges: Vec<Edge>,
}

impl Topology {
    /// Build the topology from merged peer records and the links each responding
    /// address reported.
    pub fn reconcile(
        peers: PeerTable,
        links: &BTreeMap<NodeAddress, Vec<CanonicalPeerView>>,
    ) -> Self {
        let edges = reconcile(&peers, links);
        Topology { peers, edges }
    }

    /// Per-peer and average degrees of the edge set.
    pub fn degrees(&self) -> DegreeSummary {
        DegreeSummary::from_edges(&self.edges)
    }
}

/// Deduplicate the links reported by reachable peers into an edge set.
///
/// Links with an explicit direction are placed first. A link without direction only
/// becomes an undirected edge when no edge exists for the pair in either direction.
/// Links to unknown keys and self-links are dropped.
pub fn reconcile(
    peers: &PeerTable,
    links: &BTreeMap<NodeAddress, Vec<CanonicalPeerView>>,
) -> Vec<Edge> {
    let mut edges: BTreeMap<(&NodePublicKey, &NodePublicKey), Edge> = BTreeMap::new();
    let mut deferred = Vec::new();

    for (public_key, record) in peers.reachable() {
        let Some(views) = record.address.as_ref().and_then(|address| links.get(address)) else {
            continue;
        };

        for view in views {
            let other = &view.public_key;
            if other == public_key || !peers.contains(other) {
                continue;
            }

            let (from, to) = match view.relation {
                Some(Relation::Outbound) => (public_key, other),
                Some(Relation::Inbound) => (other, public_key),
                _ => {
                    deferred.push((public_key, other));
                    continue;
                }
            };

            // The same socket is usually reported from both ends.
            if edges.contains_key(&(from, to)) || edges.contains_key(&(to, from)) {
                continue;
            }
            edges.insert(
                (from, to),
                Edge {
                    from: from.clone(),
                    to: to.clone(),
                    directed: true,
                },
            );
        }
    }

    for (peer, other) in deferred {
        if edges.contains_key(&(peer, other)) || edges.contains_key(&(other, peer)) {
            continue;
        }
        edges.insert(
            (peer, other),
            Edge {
                from: peer.clone(),
                to: other.clone(),
                directed: false,
            },
        );
    }

    debug!("Reconciled {} edges between {} peers", edges.len(), peers.len());
    edges.into_values().collect()
}

/// Edge counts of one peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Degree {
    pub inbound: usize,
    pub outbound: usize,
    pub undirected: usize,
}

impl Degree {
    pub fn total(&self) -> usize {
        self.inbound + self.outbound + self.undirected
    }
}

/// Degrees of every peer touched by at least one edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DegreeSummary {
    pub nodes: BTreeMap<NodePublicKey, Degree>,
    pub in_degree_avg: f64,
    pub out_degree_avg: f64,
    pub undirected_degree_avg: f64,
}

impl DegreeSummary {
    pub fn from_edges(edges: &[Edge]) -> Self {
        let mut nodes: BTreeMap<NodePublicKey, Degree> = BTreeMap::new();

        for edge in edges {
            if edge.directed {
                nodes.entry(edge.from.clone()).or_default().outbound += 1;
                nodes.entry(edge.to.clone()).or_default().inbound += 1;
            } else {
                nodes.entry(edge.from.clone()).or_default().undirected += 1;
                nodes.entry(edge.to.clone()).or_default().undirected += 1;
            }
        }

        let average = |f: fn(&Degree) -> usize| {
            if nodes.is_empty() {
                0.0
            } else {
                nodes.values().map(f).sum::<usize>() as f64 / nodes.len() as f64
            }
        };
        let in_degree_avg = average(|d| d.inbound);
        let out_degree_avg = average(|d| d.outbound);
        let undirected_degree_avg = average(|d| d.undirected);

        DegreeSummary {
            nodes,
            in_degree_avg,
            out_degree_avg,
            undirected_degree_avg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::PeerFields;

    fn key(seed: u8) -> NodePublicKey {
        let mut bytes = [seed; 33];
        bytes[0] = 0x02;
        NodePublicKey::from_bytes(&bytes).unwrap()
    }

    fn addr(seed: u8) -> NodeAddress {
        NodeAddress::new(format!("10.0.0.{seed}"), 51235)
    }

    fn view(seed: u8, relation: Option<Relation>) -> CanonicalPeerView {
        CanonicalPeerView {
            public_key: key(seed),
            address: Some(addr(seed)),
            relation,
            version: None,
        }
    }

    /// Build a table of peers `seeds`, reachable when they appear in `links`.
    fn table(seeds: &[u8], links: &BTreeMap<NodeAddress, Vec<CanonicalPeerView>>) -> PeerTable {
        let mut peers = PeerTable::new();
        for &seed in seeds {
            peers.merge(
                &key(seed),
                PeerFields {
                    address: Some(addr(seed)),
                    ..Default::default()
                },
                true,
            );
        }
        peers.mark_reachable(|address| links.contains_key(address));
        peers
    }

    #[test]
    fn test_both_ends_directed_single_edge() {
        let links = BTreeMap::from([
            (addr(1), vec![view(2, Some(Relation::Outbound))]),
            (addr(2), vec![view(1, Some(Relation::Inbound))]),
        ]);
        let peers = table(&[1, 2], &links);

        assert_eq!(
            reconcile(&peers, &links),
            vec![Edge {
                from: key(1),
                to: key(2),
                directed: true
            }]
        );
    }

    #[test]
    fn test_ambiguous_both_ends_single_undirected_edge() {
        let links = BTreeMap::from([
            (addr(1), vec![view(2, Some(Relation::Ambiguous))]),
            (addr(2), vec![view(1, Some(Relation::Ambiguous))]),
        ]);
        let peers = table(&[1, 2], &links);

        let edges = reconcile(&peers, &links);
        assert_eq!(edges.len(), 1);
        assert!(!edges[0].directed);
    }

    #[test]
    fn test_directed_evidence_wins_over_ambiguous() {
        // Ambiguous report is visited first, direction known only from the other end.
        let links = BTreeMap::from([
            (addr(1), vec![view(2, None)]),
            (addr(2), vec![view(1, Some(Relation::Outbound))]),
        ]);
        let peers = table(&[1, 2], &links);

        assert_eq!(
            reconcile(&peers, &links),
            vec![Edge {
                from: key(2),
                to: key(1),
                directed: true
            }]
        );
    }

    #[test]
    fn test_opposing_directions_single_edge() {
        let links = BTreeMap::from([
            (addr(1), vec![view(2, Some(Relation::Outbound))]),
            (addr(2), vec![view(1, Some(Relation::Outbound))]),
        ]);
        let peers = table(&[1, 2], &links);

        let edges = reconcile(&peers, &links);
        assert_eq!(edges.len(), 1);
        assert!(edges[0].directed);
    }

    #[test]
    fn test_self_link_dropped() {
        let links = BTreeMap::from([(addr(1), vec![view(1, Some(Relation::Outbound))])]);
        let peers = table(&[1], &links);
        assert!(reconcile(&peers, &links).is_empty());
    }

    #[test]
    fn test_unreachable_peer_contributes_nothing() {
        // Peer 2 is known but never answered, peer 1 has no record.
        let links = BTreeMap::from([(addr(3), vec![view(2, Some(Relation::Outbound))])]);
        let peers = table(&[2], &links);
        assert!(reconcile(&peers, &links).is_empty());
    }

    #[test]
    fn test_link_to_unknown_key_ignored() {
        let links = BTreeMap::from([(addr(1), vec![view(9, Some(Relation::Outbound))])]);
        let peers = table(&[1], &links);
        assert!(reconcile(&peers, &links).is_empty());
    }

    #[test]
    fn test_degree_summary() {
        let edges = vec![
            Edge {
                from: key(1),
                to: key(2),
                directed: true,
            },
            Edge {
                from: key(1),
                to: key(3),
                directed: false,
            },
        ];
        let summary = DegreeSummary::from_edges(&edges);

        assert_eq!(
            summary.nodes[&key(1)],
            Degree {
                inbound: 0,
                outbound: 1,
                undirected: 1
            }
        );
        assert_eq!(summary.nodes[&key(2)].inbound, 1);
        assert_eq!(summary.nodes[&key(3)].total(), 1);
        assert!((summary.out_degree_avg - 1.0 / 3.0).abs() < f64::EPSILON);
        assert!((summary.undirected_degree_avg - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_degree_summary() {
        let summary = DegreeSummary::from_edges(&[]);
        assert!(summary.nodes.is_empty());
        assert_eq!(summary.in_degree_avg, 0.0);
    }
}
