//! Errors that end a crawl run.

use overlay_peers_connection::{AddressError, NodeAddress};
use std::error::Error;
use std::fmt;

/// Errors that abort a crawl.
///
/// Per-link and per-address failures are recorded in the outcome instead. These
/// variants signal a bad entry point or corrupted scheduler state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlError {
    /// The entry address could not be parsed.
    InvalidEntry(AddressError),
    /// An address was queued while already tracked.
    AlreadyQueued(NodeAddress),
    /// An address was taken off the queue while not tracked.
    NotQueued(NodeAddress),
    /// The session ended without reporting an outcome.
    SessionLost,
}

impl fmt::Display for CrawlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlError::InvalidEntry(err) => write!(f, "Invalid entry address: {err}"),
            CrawlError::AlreadyQueued(address) => write!(f, "{address} queued already"),
            CrawlError::NotQueued(address) => write!(f, "{address} not queued already"),
            CrawlError::SessionLost => write!(f, "Crawl session ended without an outcome"),
        }
    }
}

impl Error for CrawlError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CrawlError::InvalidEntry(err) => Some(err),
            CrawlError::AlreadyQueued(_) => None,
            CrawlError::NotQueued(_) => None,
            CrawlError::SessionLost => None,
        }
    }
}

impl From<AddressError> for CrawlError {
    fn from(err: AddressError) -> Self {
        CrawlError::InvalidEntry(err)
    }
}
