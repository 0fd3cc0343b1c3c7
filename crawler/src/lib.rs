mod builder;
mod crawler;
mod error;
pub mod export;
mod fetch;
mod graph;
mod normalize;
mod records;
mod session;
mod state;

pub use builder::{CrawlerBuilder, CrawlerBuilderError, DEFAULT_MAX_IN_FLIGHT};
pub use crawler::{CrawlHandle, CrawlOutcome, Crawler, CrawlerMessage};
pub use error::CrawlError;
pub use fetch::{HttpFetcher, PeerListFetcher};
pub use graph::{reconcile, Degree, DegreeSummary, Edge, Topology};
pub use normalize::{normalize_response, CanonicalPeerView, NormalizedResponse};
pub use records::{PeerFields, PeerRecord, PeerTable};
pub use state::{AddressState, CrawlState};

// Re-exports.
pub use overlay_peers_connection::{
    AddressError, ClientConfiguration, ClientError, CrawlResponse, KeyError, NodeAddress,
    NodePublicKey, RawObservation, Relation, DEFAULT_PEER_PORT,
};
