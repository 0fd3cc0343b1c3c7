//! HTTP client for a node's crawl endpoint.
//!
//! # Examples
//!
//! Fetching the active peer list of a single node.
//!
//! ```no_run
//! use overlay_peers_connection::{ClientConfiguration, CrawlClient, NodeAddress};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CrawlClient::new(ClientConfiguration::default())?;
//! let address: NodeAddress = "192.170.145.67".parse()?;
//!
//! let response = client.fetch(&address).await?;
//! println!("{} active peers", response.overlay.active.len());
//! # Ok(())
//! # }
//! ```

mod configuration;
mod error;

pub use configuration::{default_user_agent, ClientConfiguration, DEFAULT_REQUEST_TIMEOUT};
pub use error::ClientError;

use crate::address::NodeAddress;
use crate::message::CrawlResponse;
use log::debug;

/// Client for the `/crawl` endpoint of overlay nodes.
///
/// Cheap to clone, clones share one connection pool.
#[derive(Debug, Clone)]
pub struct CrawlClient {
    http: reqwest::Client,
    config: ClientConfiguration,
}

impl CrawlClient {
    /// Build a client from the given configuration.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlClient)` - A ready client.
    /// * `Err(ClientError::Build)` - If the TLS backend could not be initialized.
    pub fn new(config: ClientConfiguration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_certificates)
            .timeout(config.request_timeout)
            .user_agent(
                config
                    .user_agent
                    .clone()
                    .unwrap_or_else(default_user_agent),
            )
            .build()
            .map_err(ClientError::Build)?;

        Ok(CrawlClient { http, config })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfiguration {
        &self.config
    }

    /// Request the active peer list of the node at `address`.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResponse)` - The parsed response body.
    /// * `Err(ClientError)` - On transport failure, timeout, error status, or an unparseable body.
    pub async fn fetch(&self, address: &NodeAddress) -> Result<CrawlResponse, ClientError> {
        let url = address.crawl_url();
        debug!("Requesting {url}");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let parsed = CrawlResponse::from_slice(&body)?;
        debug!(
            "Received {} active peers from {address}",
            parsed.overlay.active.len()
        );
        Ok(parsed)
    }
}
