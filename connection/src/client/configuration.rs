//! Client configuration types and constants.

use std::time::Duration;

/// Default user agent for overlay-peers requests.
pub fn default_user_agent() -> String {
    format!("overlay-peers/{}", env!("CARGO_PKG_VERSION"))
}

/// Default timeout for a single crawl request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration used to build a [`CrawlClient`](super::CrawlClient).
#[derive(Debug, Clone)]
pub struct ClientConfiguration {
    /// Upper bound for one request, connect through body.
    pub request_timeout: Duration,
    /// Whether to verify node TLS certificates.
    ///
    /// Nodes commonly present self-signed certificates, so this is off by default.
    pub verify_certificates: bool,
    /// User agent sent with each request. Defaults to the overlay-peers user agent if None.
    pub user_agent: Option<String>,
}

impl ClientConfiguration {
    /// Returns the configuration with a different request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Returns the configuration with certificate verification switched on or off.
    pub fn with_certificate_verification(mut self, verify: bool) -> Self {
        self.verify_certificates = verify;
        self
    }

    /// Returns the configuration with a custom user agent.
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

impl Default for ClientConfiguration {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            verify_certificates: false,
            user_agent: None,
        }
    }
}
