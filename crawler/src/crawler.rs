use crate::builder::CrawlerBuilder;
use crate::error::CrawlError;
use crate::fetch::{HttpFetcher, PeerListFetcher};
use crate::graph::Topology;
use crate::normalize::CanonicalPeerView;
use crate::records::PeerTable;
use crate::session::{CrawlSession, SessionConfig};
use overlay_peers_connection::{CrawlResponse, NodeAddress};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Progress messages sent from a crawl run as requests complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlerMessage {
    /// A node answered with its peer list.
    Responded {
        address: NodeAddress,
        hops: u32,
        active_peers: usize,
    },
    /// A node's request failed or timed out. It is not retried.
    Failed {
        address: NodeAddress,
        hops: u32,
        code: String,
    },
}

impl fmt::Display for CrawlerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlerMessage::Responded {
                address,
                hops,
                active_peers,
            } => write!(f, "Responded: {address} (hops: {hops}, active peers: {active_peers})"),
            CrawlerMessage::Failed {
                address,
                hops,
                code,
            } => write!(f, "Failed: {address} (hops: {hops}, error: {code})"),
        }
    }
}

/// Everything a finished crawl run collected.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Normalized entry address.
    pub entry: NodeAddress,
    /// Raw response per node that answered.
    pub responses: BTreeMap<NodeAddress, CrawlResponse>,
    /// Error code per node that failed.
    pub errors: BTreeMap<NodeAddress, String>,
    /// Normalized active links per node that answered.
    pub links: BTreeMap<NodeAddress, Vec<CanonicalPeerView>>,
    /// Merged peer records.
    pub peers: PeerTable,
}

impl CrawlOutcome {
    /// Share of requested nodes that answered.
    pub fn coverage(&self) -> f64 {
        let attempted = self.responses.len() + self.errors.len();
        if attempted == 0 {
            return 0.0;
        }
        self.responses.len() as f64 / attempted as f64
    }

    /// Reconcile the collected links into a deduplicated topology.
    pub fn topology(&self) -> Topology {
        Topology::reconcile(self.peers.clone(), &self.links)
    }
}

/// Handle to a running crawl.
///
/// Progress messages arrive on [`CrawlHandle::next_message`] until the run ends, the
/// outcome is available once through [`CrawlHandle::finish`].
#[derive(Debug)]
pub struct CrawlHandle {
    progress_rx: mpsc::UnboundedReceiver<CrawlerMessage>,
    outcome_rx: oneshot::Receiver<Result<CrawlOutcome, CrawlError>>,
}

impl CrawlHandle {
    /// Next progress message, `None` once the run has ended.
    pub async fn next_message(&mut self) -> Option<CrawlerMessage> {
        self.progress_rx.recv().await
    }

    /// Wait for the run to end.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - The collected responses, errors, and peer records.
    /// * `Err(CrawlError)` - If the run aborted.
    pub async fn finish(self) -> Result<CrawlOutcome, CrawlError> {
        self.outcome_rx
            .await
            .map_err(|_| CrawlError::SessionLost)?
    }
}

/// A topology crawler for the overlay network.
///
/// Each call to [`Crawler::crawl`] starts an independent run with its own state.
#[derive(Debug, Clone)]
pub struct Crawler<F: PeerListFetcher = HttpFetcher> {
    fetcher: F,
    max_in_flight: usize,
    request_timeout: Duration,
}

impl Crawler<HttpFetcher> {
    /// Builder with the default configuration.
    pub fn builder() -> CrawlerBuilder {
        CrawlerBuilder::new()
    }
}

impl<F: PeerListFetcher> Crawler<F> {
    pub(crate) fn new(fetcher: F, max_in_flight: usize, request_timeout: Duration) -> Self {
        Crawler {
            fetcher,
            max_in_flight,
            request_timeout,
        }
    }

    /// Maximum number of simultaneously outstanding requests.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Start crawling from `entry`, a bare host or `host:port`.
    ///
    /// The run executes on a spawned task. It ends when every address reachable from
    /// the entry has either answered or failed.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlHandle)` - Handle for progress and the final outcome.
    /// * `Err(CrawlError::InvalidEntry)` - If the entry address cannot be parsed.
    pub async fn crawl(&self, entry: &str) -> Result<CrawlHandle, CrawlError> {
        let entry: NodeAddress = entry.parse()?;

        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let session = CrawlSession::new(
            SessionConfig {
                max_in_flight: self.max_in_flight,
                request_timeout: self.request_timeout,
            },
            self.fetcher.clone(),
            progress_tx,
        );

        tokio::spawn(async move {
            let outcome = session.run(entry).await;
            // Caller may have dropped the handle.
            let _ = outcome_tx.send(outcome);
        });

        Ok(CrawlHandle {
            progress_rx,
            outcome_rx,
        })
    }

    /// Crawl from `entry` and wait for the outcome, ignoring progress.
    pub async fn run(&self, entry: &str) -> Result<CrawlOutcome, CrawlError> {
        self.crawl(entry).await?.finish().await
    }
}
