mod address;
mod client;
mod message;
mod public_key;

pub use address::{AddressError, NodeAddress, DEFAULT_PEER_PORT};
pub use client::{
    default_user_agent, ClientConfiguration, ClientError, CrawlClient, DEFAULT_REQUEST_TIMEOUT,
};
pub use message::{CrawlResponse, Overlay, RawObservation, Relation};
pub use public_key::{KeyError, NodePublicKey, NODE_PUBLIC_KEY_LEN, NODE_PUBLIC_VERSION};
