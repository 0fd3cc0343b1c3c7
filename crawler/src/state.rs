//! Per-run address bookkeeping for the crawl scheduler.

use crate::error::CrawlError;
use overlay_peers_connection::{CrawlResponse, NodeAddress};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Where an address is in its crawl lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressState {
    Unseen,
    Queued,
    InFlight,
    Responded,
    Failed,
}

/// Queue, in-flight set, and results of one crawl run.
///
/// An address moves `Unseen -> Queued -> InFlight -> Responded | Failed` and never
/// goes back, so no address is requested twice.
#[derive(Debug, Default)]
pub struct CrawlState {
    /// FIFO of addresses waiting for a request.
    queue: VecDeque<NodeAddress>,
    /// Hop distance of each queued address.
    queued: HashMap<NodeAddress, u32>,
    /// Hop distance of each address with an outstanding request.
    in_flight: HashMap<NodeAddress, u32>,
    responses: BTreeMap<NodeAddress, CrawlResponse>,
    /// Error code per failed address.
    errors: BTreeMap<NodeAddress, String>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_of(&self, address: &NodeAddress) -> AddressState {
        if self.queued.contains_key(address) {
            AddressState::Queued
        } else if self.in_flight.contains_key(address) {
            AddressState::InFlight
        } else if self.responses.contains_key(address) {
            AddressState::Responded
        } else if self.errors.contains_key(address) {
            AddressState::Failed
        } else {
            AddressState::Unseen
        }
    }

    /// Accept an unseen address for visiting at `hops`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The address is queued.
    /// * `Err(CrawlError::AlreadyQueued)` - If the address was seen before.
    pub fn enqueue(&mut self, address: NodeAddress, hops: u32) -> Result<(), CrawlError> {
        if self.state_of(&address) != AddressState::Unseen {
            return Err(CrawlError::AlreadyQueued(address));
        }
        self.queue.push_back(address.clone());
        self.queued.insert(address, hops);
        Ok(())
    }

    /// Queue `address` only if it has never been seen.
    ///
    /// # Returns
    ///
    /// `true` if the address was queued.
    pub fn enqueue_if_unseen(&mut self, address: &NodeAddress, hops: u32) -> bool {
        if self.state_of(address) != AddressState::Unseen {
            return false;
        }
        self.queue.push_back(address.clone());
        self.queued.insert(address.clone(), hops);
        true
    }

    /// Move the oldest queued address in flight.
    ///
    /// # Returns
    ///
    /// The address and its hop distance, or `None` if nothing is queued.
    pub fn begin_next(&mut self) -> Result<Option<(NodeAddress, u32)>, CrawlError> {
        let Some(address) = self.queue.pop_front() else {
            return Ok(None);
        };
        let hops = self
            .queued
            .remove(&address)
            .ok_or_else(|| CrawlError::NotQueued(address.clone()))?;
        self.in_flight.insert(address.clone(), hops);
        Ok(Some((address, hops)))
    }

    /// Remove a completed address from the in-flight set.
    ///
    /// # Returns
    ///
    /// * `Ok(u32)` - The hop distance the address was visited at.
    /// * `Err(CrawlError::NotQueued)` - If the address had no outstanding request.
    pub fn dequeue(&mut self, address: &NodeAddress) -> Result<u32, CrawlError> {
        self.in_flight
            .remove(address)
            .ok_or_else(|| CrawlError::NotQueued(address.clone()))
    }

    pub fn record_response(&mut self, address: NodeAddress, response: CrawlResponse) {
        self.responses.insert(address, response);
    }

    pub fn record_error(&mut self, address: NodeAddress, code: String) {
        self.errors.insert(address, code);
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn responses(&self) -> &BTreeMap<NodeAddress, CrawlResponse> {
        &self.responses
    }

    pub fn errors(&self) -> &BTreeMap<NodeAddress, String> {
        &self.errors
    }

    /// Nothing queued and nothing outstanding.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_empty()
    }

    /// Consume the state, returning responses and errors.
    pub fn into_results(
        self,
    ) -> (
        BTreeMap<NodeAddress, CrawlResponse>,
        BTreeMap<NodeAddress, String>,
    ) {
        (self.responses, self.errors)
    }
}
