//! JSON snapshots of a finished crawl.
//!
//! Two files come out of a run: the raw responses keyed by address, passed through
//! as the nodes sent them, and the reconciled topology with a short summary.

use crate::crawler::CrawlOutcome;
use crate::graph::{DegreeSummary, Edge, Topology};
use crate::records::PeerTable;
use log::info;
use overlay_peers_connection::NodeAddress;
use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Errors that can occur while writing a snapshot.
#[derive(Debug)]
pub enum ExportError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Io(err) => write!(f, "Failed to write snapshot: {err}"),
            ExportError::Json(err) => write!(f, "Failed to encode snapshot: {err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExportError::Io(err) => Some(err),
            ExportError::Json(err) => Some(err),
        }
    }
}

impl From<io::Error> for ExportError {
    fn from(err: io::Error) -> Self {
        ExportError::Io(err)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Json(err)
    }
}

/// Headline numbers of a crawl run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlSummary {
    pub entry: NodeAddress,
    pub peers: usize,
    pub reachable_peers: usize,
    pub edges: usize,
    pub directed_edges: usize,
    pub responded: usize,
    pub failed: usize,
    pub coverage: f64,
}

impl CrawlSummary {
    pub fn new(outcome: &CrawlOutcome, topology: &Topology) -> Self {
        CrawlSummary {
            entry: outcome.entry.clone(),
            peers: topology.peers.len(),
            reachable_peers: topology.peers.reachable().count(),
            edges: topology.edges.len(),
            directed_edges: topology.edges.iter().filter(|e| e.directed).count(),
            responded: outcome.responses.len(),
            failed: outcome.errors.len(),
            coverage: outcome.coverage(),
        }
    }
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} peers ({} reachable), {} edges ({} directed), {} responded, {} failed, {:.1}% coverage",
            self.entry,
            self.peers,
            self.reachable_peers,
            self.edges,
            self.directed_edges,
            self.responded,
            self.failed,
            self.coverage * 100.0
        )
    }
}

#[derive(Serialize)]
struct TopologySnapshot<'a> {
    summary: CrawlSummary,
    peers: &'a PeerTable,
    edges: &'a [Edge],
    degrees: DegreeSummary,
}

/// Write the raw responses of a run, keyed by address.
pub fn write_responses<W: Write>(writer: W, outcome: &CrawlOutcome) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(writer, &outcome.responses)?;
    Ok(())
}

/// Write the reconciled topology of a run with its summary and degrees.
pub fn write_topology<W: Write>(
    writer: W,
    outcome: &CrawlOutcome,
    topology: &Topology,
) -> Result<(), ExportError> {
    let snapshot = TopologySnapshot {
        summary: CrawlSummary::new(outcome, topology),
        peers: &topology.peers,
        edges: &topology.edges,
        degrees: topology.degrees(),
    };
    serde_json::to_writer_pretty(writer, &snapshot)?;
    Ok(())
}

/// Save the raw responses to `path`.
pub fn save_responses<P: AsRef<Path>>(path: P, outcome: &CrawlOutcome) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_responses(&mut writer, outcome)?;
    writer.flush()?;
    info!("Saved {} responses to {}", outcome.responses.len(), path.as_ref().display());
    Ok(())
}

/// Save the reconciled topology to `path`.
pub fn save_topology<P: AsRef<Path>>(
    path: P,
    outcome: &CrawlOutcome,
    topology: &Topology,
) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_topology(&mut writer, outcome, topology)?;
    writer.flush()?;
    info!(
        "Saved {} peers and {} edges to {}",
        topology.peers.len(),
        topology.edges.len(),
        path.as_ref().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_response;
    use crate::records::PeerFields;
    use overlay_peers_connection::{CrawlResponse, NodePublicKey, RawObservation};
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn outcome() -> CrawlOutcome {
        let mut bytes = [4u8; 33];
        bytes[0] = 0x02;
        let key = NodePublicKey::from_bytes(&bytes).unwrap();

        let entry = NodeAddress::new("10.0.0.1", 51235);
        let mut response = CrawlResponse::with_active(vec![RawObservation::new(key.as_str())
            .with_relation("out")
            .with_ip("10.0.0.4:51235")]);
        response
            .extra
            .insert("server".to_string(), Value::from("rippled"));
        let normalized = normalize_response(&entry, &response);

        let mut peers = PeerTable::new();
        peers.merge(&key, PeerFields::from_view(&normalized.views[0]), true);
        peers.merge(&key, PeerFields::hops(1), true);

        CrawlOutcome {
            entry: entry.clone(),
            responses: BTreeMap::from([(entry.clone(), response)]),
            errors: BTreeMap::from([(NodeAddress::new("10.0.0.4", 51235), "HTTP404".to_string())]),
            links: BTreeMap::from([(entry, normalized.views)]),
            peers,
        }
    }

    #[test]
    fn test_responses_pass_through() {
        let outcome = outcome();
        let mut buffer = Vec::new();
        write_responses(&mut buffer, &outcome).unwrap();

        let written: Value = serde_json::from_slice(&buffer).unwrap();
        let entry = &written["10.0.0.1:51235"];
        assert_eq!(entry["server"], "rippled");
        assert_eq!(entry["overlay"]["active"][0]["type"], "out");
    }

    #[test]
    fn test_topology_snapshot() {
        let outcome = outcome();
        let topology = outcome.topology();
        let mut buffer = Vec::new();
        write_topology(&mut buffer, &outcome, &topology).unwrap();

        let written: Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(written["summary"]["peers"], 1);
        assert_eq!(written["summary"]["failed"], 1);
        assert_eq!(written["edges"].as_array().map(Vec::len), Some(0));

        let peers = written["peers"].as_object().unwrap();
        let record = peers.values().next().unwrap();
        assert_eq!(record["hops"], 1);
        assert_eq!(record["address"], "10.0.0.4:51235");
        assert_eq!(record["reachable"], false);
    }

    #[test]
    fn test_summary_display() {
        let outcome = outcome();
        let summary = CrawlSummary::new(&outcome, &outcome.topology());
        assert_eq!(
            summary.to_string(),
            "10.0.0.1:51235: 1 peers (0 reachable), 0 edges (0 directed), 1 responded, 1 failed, 50.0% coverage"
        );
    }
}
