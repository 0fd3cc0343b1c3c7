//! Builder pattern for configuring and creating crawler instances.

use crate::crawler::Crawler;
use crate::fetch::{HttpFetcher, PeerListFetcher};
use overlay_peers_connection::{ClientConfiguration, ClientError, DEFAULT_REQUEST_TIMEOUT};
use std::fmt;
use std::time::Duration;

/// Default maximum number of simultaneously outstanding requests.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 30;

/// Errors that can occur during crawler configuration.
#[derive(Debug)]
pub enum CrawlerBuilderError {
    /// The in-flight budget must allow at least one request.
    ZeroInFlight,
    /// The HTTP client could not be created.
    Client(ClientError),
}

impl fmt::Display for CrawlerBuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlerBuilderError::ZeroInFlight => {
                write!(f, "Maximum in-flight requests must be at least 1")
            }
            CrawlerBuilderError::Client(err) => write!(f, "Invalid client configuration: {err}"),
        }
    }
}

impl std::error::Error for CrawlerBuilderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CrawlerBuilderError::ZeroInFlight => None,
            CrawlerBuilderError::Client(err) => Some(err),
        }
    }
}

/// Builder for creating a customized [`Crawler`] instance.
///
/// # Example
///
/// ```
/// # fn main() -> Result<(), overlay_peers_crawler::CrawlerBuilderError> {
/// use overlay_peers_crawler::CrawlerBuilder;
/// use std::time::Duration;
///
/// // Create a crawler with default settings
/// let basic_crawler = CrawlerBuilder::new().build()?;
///
/// // Create a crawler with custom settings
/// let custom_crawler = CrawlerBuilder::new()
///     .with_max_in_flight(100)
///     .with_request_timeout(Duration::from_secs(10))
///     .with_user_agent("topology-survey/1.0")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CrawlerBuilder {
    /// Maximum number of simultaneously outstanding requests.
    max_in_flight: usize,
    /// Timeout for a single node's request.
    request_timeout: Duration,
    /// HTTP client settings for the default fetcher.
    client: ClientConfiguration,
}

impl CrawlerBuilder {
    /// Create a new crawler builder with default settings.
    pub fn new() -> Self {
        CrawlerBuilder {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            client: ClientConfiguration::default(),
        }
    }

    /// Set the maximum number of simultaneously outstanding requests.
    ///
    /// Higher values may speed up crawling, but increase load on the crawled nodes.
    ///
    /// # Arguments
    ///
    /// * `max_in_flight` - Maximum outstanding requests (defaults to 30).
    ///
    /// # Returns
    ///
    /// Self for method chaining.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Set the timeout for a single node's request.
    ///
    /// A request that exceeds it is recorded as failed and never retried.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Maximum time per request (defaults to 5 seconds).
    ///
    /// # Returns
    ///
    /// Self for method chaining.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self.client = self.client.with_request_timeout(timeout);
        self
    }

    /// Set a custom user agent for crawl requests.
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.client = self.client.with_user_agent(user_agent);
        self
    }

    /// Enable or disable TLS certificate verification (disabled by default).
    pub fn with_certificate_verification(mut self, verify: bool) -> Self {
        self.client = self.client.with_certificate_verification(verify);
        self
    }

    /// Build a crawler that fetches over HTTPS.
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - A configured crawler.
    /// * `Err(CrawlerBuilderError)` - If the budget is zero or the client cannot be built.
    pub fn build(self) -> Result<Crawler, CrawlerBuilderError> {
        let fetcher = HttpFetcher::new(self.client.clone()).map_err(CrawlerBuilderError::Client)?;
        self.build_with_fetcher(fetcher)
    }

    /// Build a crawler that uses the given fetcher for every request.
    pub fn build_with_fetcher<F: PeerListFetcher>(
        self,
        fetcher: F,
    ) -> Result<Crawler<F>, CrawlerBuilderError> {
        if self.max_in_flight == 0 {
            return Err(CrawlerBuilderError::ZeroInFlight);
        }
        Ok(Crawler::new(fetcher, self.max_in_flight, self.request_timeout))
    }
}

impl Default for CrawlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::test_utils::MockFetcher;

    #[test]
    fn test_zero_in_flight_rejected() {
        let result = CrawlerBuilder::new()
            .with_max_in_flight(0)
            .build_with_fetcher(MockFetcher::default());
        assert!(matches!(result, Err(CrawlerBuilderError::ZeroInFlight)));
    }

    #[test]
    fn test_defaults() {
        let crawler = CrawlerBuilder::new().build().unwrap();
        assert_eq!(crawler.max_in_flight(), DEFAULT_MAX_IN_FLIGHT);
    }
}
