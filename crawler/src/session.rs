//! Internal session coordination for crawling operations.
//!
//! This module contains the [`CrawlSession`] which runs one breadth-first crawl:
//! it owns the address state and peer table, issues requests up to the in-flight
//! budget and folds each response into the run as it completes.

use crate::crawler::{CrawlOutcome, CrawlerMessage};
use crate::error::CrawlError;
use crate::fetch::PeerListFetcher;
use crate::normalize::{normalize_response, CanonicalPeerView};
use crate::records::{PeerFields, PeerTable};
use crate::state::CrawlState;
use log::{debug, info, warn};
use overlay_peers_connection::{ClientError, CrawlResponse, NodeAddress};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Configuration for a crawl session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_in_flight: usize,
    pub request_timeout: Duration,
}

/// A finished request, reported back to the coordinator.
#[derive(Debug)]
struct Completion {
    address: NodeAddress,
    result: Result<CrawlResponse, ClientError>,
}

/// Coordinator for a single crawl run.
///
/// # Architecture
///
/// * **Coordinator** (`run()`) - Owns all crawl state. Drains the queue up to the
///   in-flight budget, then waits for the next completion.
/// * **Requests** (`visit()`) - Spawned tasks that only perform the fetch and report
///   back over a channel.
///
/// Completions are handled one at a time by the coordinator, so merging and
/// queueing never race and no locking is needed.
pub struct CrawlSession<F: PeerListFetcher> {
    config: SessionConfig,
    fetcher: F,
    /// Progress notifications for the caller.
    progress_tx: mpsc::UnboundedSender<CrawlerMessage>,
    state: CrawlState,
    peers: PeerTable,
    /// Normalized links per responding address.
    links: BTreeMap<NodeAddress, Vec<CanonicalPeerView>>,
}

impl<F: PeerListFetcher> CrawlSession<F> {
    /// Create a new crawl session.
    pub fn new(
        config: SessionConfig,
        fetcher: F,
        progress_tx: mpsc::UnboundedSender<CrawlerMessage>,
    ) -> Self {
        Self {
            config,
            fetcher,
            progress_tx,
            state: CrawlState::new(),
            peers: PeerTable::new(),
            links: BTreeMap::new(),
        }
    }

    /// Crawl outward from `entry` until no address is queued or in flight.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - Responses, errors, and merged peer records.
    /// * `Err(CrawlError)` - If the scheduler state was corrupted.
    pub async fn run(mut self, entry: NodeAddress) -> Result<CrawlOutcome, CrawlError> {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();

        info!("Entering {entry}");
        self.state.enqueue(entry.clone(), 0)?;

        let mut last_log_time = Instant::now();
        let log_interval = Duration::from_secs(60);

        loop {
            self.drain(&done_tx)?;

            if self.state.is_idle() {
                info!(
                    "Crawler exhausted - {} responded, {} failed, {} peers known",
                    self.state.responses().len(),
                    self.state.errors().len(),
                    self.peers.len()
                );
                break;
            }

            if last_log_time.elapsed() >= log_interval {
                info!(
                    "{} in flight (max: {}), {} queued, {} responded, {} failed",
                    self.state.in_flight_count(),
                    self.config.max_in_flight,
                    self.state.queued_count(),
                    self.state.responses().len(),
                    self.state.errors().len()
                );
                last_log_time = Instant::now();
            }

            // The coordinator holds a sender, so the channel never closes here.
            let Some(completion) = done_rx.recv().await else {
                return Err(CrawlError::SessionLost);
            };
            self.complete(completion)?;
        }

        Ok(self.finish(entry))
    }

    /// Issue requests for queued addresses while under the in-flight budget.
    fn drain(&mut self, done_tx: &mpsc::UnboundedSender<Completion>) -> Result<(), CrawlError> {
        while self.state.in_flight_count() < self.config.max_in_flight {
            match self.state.begin_next()? {
                Some((address, hops)) => self.visit(address, hops, done_tx.clone()),
                None => break,
            }
        }
        Ok(())
    }

    /// Spawn the request for one address.
    fn visit(&self, address: NodeAddress, hops: u32, done_tx: mpsc::UnboundedSender<Completion>) {
        debug!("Requesting {address} at {hops} hops");

        let fetcher = self.fetcher.clone();
        let request_timeout = self.config.request_timeout;
        let requested = address.clone();
        let request = tokio::spawn(async move {
            match timeout(request_timeout, fetcher.fetch(&requested)).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout),
            }
        });

        tokio::spawn(async move {
            // A request task that dies still has to report, or the run never ends.
            let result = match request.await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Request to {address} aborted: {e}");
                    Err(ClientError::Aborted)
                }
            };
            // Only fails once the run has been abandoned.
            let _ = done_tx.send(Completion { address, result });
        });
    }

    /// Fold one finished request into the run.
    fn complete(&mut self, completion: Completion) -> Result<(), CrawlError> {
        let Completion { address, result } = completion;
        let hops = self.state.dequeue(&address)?;

        match result {
            Ok(response) => {
                let normalized = normalize_response(&address, &response);
                // Recorded first so a node listing itself is not queued again.
                self.state.record_response(address.clone(), response);

                for view in &normalized.views {
                    self.peers
                        .merge(&view.public_key, PeerFields::from_view(view), true);
                    self.peers
                        .merge(&view.public_key, PeerFields::hops(hops + 1), true);
                    if let Some(link_address) = &view.address {
                        self.state.enqueue_if_unseen(link_address, hops + 1);
                    }
                }

                let active_peers = normalized.views.len();
                self.links.insert(address.clone(), normalized.views);
                self.notify(CrawlerMessage::Responded {
                    address,
                    hops,
                    active_peers,
                });
            }
            Err(e) => {
                debug!("{address} has err {e}");
                let code = e.code();
                self.state.record_error(address.clone(), code.clone());
                self.notify(CrawlerMessage::Failed {
                    address,
                    hops,
                    code,
                });
            }
        }

        Ok(())
    }

    fn notify(&self, message: CrawlerMessage) {
        // Progress is best effort, the caller may not be listening.
        if self.progress_tx.send(message).is_err() {
            debug!("Progress receiver dropped");
        }
    }

    fn finish(self, entry: NodeAddress) -> CrawlOutcome {
        let (responses, errors) = self.state.into_results();
        let mut peers = self.peers;
        peers.mark_reachable(|address| responses.contains_key(address));

        CrawlOutcome {
            entry,
            responses,
            errors,
            links: self.links,
            peers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::test_utils::MockFetcher;
    use overlay_peers_connection::{NodePublicKey, RawObservation};
    use std::collections::HashMap;
    use std::future::Future;

    /// Fetcher whose request for one address panics.
    #[derive(Clone)]
    struct PanickingFetcher {
        inner: MockFetcher,
        panics_on: NodeAddress,
    }

    impl PeerListFetcher for PanickingFetcher {
        fn fetch(
            &self,
            address: &NodeAddress,
        ) -> impl Future<Output = Result<CrawlResponse, ClientError>> + Send {
            let inner = self.inner.clone();
            let address = address.clone();
            let panics = address == self.panics_on;
            async move {
                if panics {
                    panic!("fetcher broke on {address}");
                }
                inner.fetch(&address).await
            }
        }
    }

    fn key(seed: u8) -> NodePublicKey {
        let mut bytes = [seed; 33];
        bytes[0] = 0x02;
        NodePublicKey::from_bytes(&bytes).unwrap()
    }

    fn addr(seed: u8) -> NodeAddress {
        NodeAddress::new(format!("10.0.0.{seed}"), 51235)
    }

    fn link(seed: u8, relation: &str) -> RawObservation {
        RawObservation::new(key(seed).as_str())
            .with_relation(relation)
            .with_ip(addr(seed).to_string())
    }

    fn config(max_in_flight: usize) -> SessionConfig {
        SessionConfig {
            max_in_flight,
            request_timeout: Duration::from_secs(5),
        }
    }

    async fn run(
        fetcher: MockFetcher,
        max_in_flight: usize,
    ) -> (CrawlOutcome, Vec<CrawlerMessage>) {
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let session = CrawlSession::new(config(max_in_flight), fetcher, progress_tx);
        let outcome = session.run(addr(1)).await.unwrap();

        let mut messages = Vec::new();
        while let Some(message) = progress_rx.recv().await {
            messages.push(message);
        }
        (outcome, messages)
    }

    #[tokio::test]
    async fn test_unreachable_neighbor() {
        let fetcher = MockFetcher::new(HashMap::from([(
            addr(1),
            CrawlResponse::with_active(vec![link(2, "out")]),
        )]));

        let (outcome, messages) = run(fetcher, 4).await;

        let record = outcome.peers.get(&key(2)).unwrap();
        assert_eq!(record.hops, Some(1));
        assert!(!record.reachable);
        assert_eq!(outcome.errors.get(&addr(2)).map(String::as_str), Some("HTTP404"));
        assert!(outcome.topology().edges.is_empty());
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn test_cycle_visited_once() {
        // 1 -> 2 -> 3 -> 1, every node also lists itself.
        let fetcher = MockFetcher::new(HashMap::from([
            (
                addr(1),
                CrawlResponse::with_active(vec![link(2, "out"), link(1, "peer")]),
            ),
            (
                addr(2),
                CrawlResponse::with_active(vec![link(3, "out"), link(2, "peer")]),
            ),
            (
                addr(3),
                CrawlResponse::with_active(vec![link(1, "out"), link(3, "peer")]),
            ),
        ]));

        let (outcome, _) = run(fetcher.clone(), 1).await;

        assert_eq!(outcome.responses.len(), 3);
        assert!(outcome.errors.is_empty());
        assert!(fetcher.requests().values().all(|&count| count == 1));
        assert_eq!(outcome.coverage(), 1.0);
    }

    #[tokio::test]
    async fn test_hops_follow_discovery() {
        let fetcher = MockFetcher::new(HashMap::from([
            (addr(1), CrawlResponse::with_active(vec![link(2, "out")])),
            (addr(2), CrawlResponse::with_active(vec![link(3, "out")])),
            (
                addr(3),
                CrawlResponse::with_active(vec![link(1, "out"), link(2, "in")]),
            ),
        ]));

        let (outcome, _) = run(fetcher, 8).await;

        assert_eq!(outcome.peers.get(&key(2)).unwrap().hops, Some(1));
        assert_eq!(outcome.peers.get(&key(3)).unwrap().hops, Some(2));
        // Only learned about from the far end of the chain.
        assert_eq!(outcome.peers.get(&key(1)).unwrap().hops, Some(3));
    }

    #[tokio::test]
    async fn test_reachable_when_port_reported_later() {
        // 1 only sees 3 inbound without a port, 2 reports the port 3 listens on.
        let listening = NodeAddress::new("10.0.0.3", 51236);
        let fetcher = MockFetcher::new(HashMap::from([
            (
                addr(1),
                CrawlResponse::with_active(vec![
                    RawObservation::new(key(3).as_str())
                        .with_relation("peer")
                        .with_ip("10.0.0.3"),
                    link(2, "out"),
                ]),
            ),
            (
                addr(2),
                CrawlResponse::with_active(vec![RawObservation::new(key(3).as_str())
                    .with_relation("out")
                    .with_ip(listening.to_string())]),
            ),
            (
                listening.clone(),
                CrawlResponse::with_active(vec![link(2, "in")]),
            ),
        ]));

        let (outcome, _) = run(fetcher, 1).await;

        assert!(outcome.responses.contains_key(&listening));
        assert!(outcome.errors.contains_key(&addr(3)));
        let record = outcome.peers.get(&key(3)).unwrap();
        assert!(record.reachable);
        assert_eq!(record.address, Some(listening));

        // Links reported by 3 take part in reconciliation.
        let topology = outcome.topology();
        assert!(topology
            .edges
            .iter()
            .any(|edge| edge.from == key(2) && edge.to == key(3) && edge.directed));
    }

    #[tokio::test]
    async fn test_panicking_request_recorded_as_failure() {
        let fetcher = PanickingFetcher {
            inner: MockFetcher::new(HashMap::from([(
                addr(1),
                CrawlResponse::with_active(vec![link(2, "out")]),
            )])),
            panics_on: addr(2),
        };

        let (progress_tx, _progress_rx) = mpsc::unbounded_channel();
        let session = CrawlSession::new(config(2), fetcher, progress_tx);
        let outcome = timeout(Duration::from_secs(5), session.run(addr(1)))
            .await
            .unwrap()
            .unwrap();

        assert!(outcome.responses.contains_key(&addr(1)));
        assert_eq!(
            outcome.errors.get(&addr(2)).map(String::as_str),
            Some("EABORTED")
        );
    }

    #[tokio::test]
    async fn test_timeout_recorded_as_failure() {
        let fetcher = MockFetcher::new(HashMap::from([
            (addr(1), CrawlResponse::with_active(vec![link(2, "out")])),
            (addr(2), CrawlResponse::default()),
        ]))
        .with_delays(HashMap::from([(addr(2), Duration::from_secs(60))]));

        let (progress_tx, _progress_rx) = mpsc::unbounded_channel();
        let session = CrawlSession::new(
            SessionConfig {
                max_in_flight: 2,
                request_timeout: Duration::from_millis(50),
            },
            fetcher,
            progress_tx,
        );
        let outcome = session.run(addr(1)).await.unwrap();

        assert_eq!(
            outcome.errors.get(&addr(2)).map(String::as_str),
            Some("ETIMEDOUT")
        );
        assert_eq!(outcome.coverage(), 0.5);
    }
}
