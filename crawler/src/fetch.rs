//! Peer list fetching abstractions.
//!
//! This module provides the [`PeerListFetcher`] trait that abstracts the network
//! request for a node's peer list, so the scheduler can be driven by fixed
//! responses in tests.

use overlay_peers_connection::{
    ClientConfiguration, ClientError, CrawlClient, CrawlResponse, NodeAddress,
};
use std::future::Future;

/// Capability to fetch the active peer list of one node.
pub trait PeerListFetcher: Clone + Send + Sync + 'static {
    /// Fetch the crawl response of the node at `address`.
    fn fetch(
        &self,
        address: &NodeAddress,
    ) -> impl Future<Output = Result<CrawlResponse, ClientError>> + Send;
}

/// Standard fetcher that requests the node's crawl endpoint over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: CrawlClient,
}

impl HttpFetcher {
    /// Create a fetcher with the given client configuration.
    pub fn new(config: ClientConfiguration) -> Result<Self, ClientError> {
        Ok(Self {
            client: CrawlClient::new(config)?,
        })
    }
}

impl PeerListFetcher for HttpFetcher {
    fn fetch(
        &self,
        address: &NodeAddress,
    ) -> impl Future<Output = Result<CrawlResponse, ClientError>> + Send {
        let client = self.client.clone();
        let address = address.clone();
        async move { client.fetch(&address).await }
    }
}
