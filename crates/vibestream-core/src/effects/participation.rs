//! Control surface of deployed participation resources.

use crate::errors::{VibeError, VibeResult};
use crate::identifiers::ResourceAddress;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Host that forwards reserve-price updates to participation resources
pub trait ParticipationHost: Send {
    /// Set the reserve price of the participation resource at `resource`
    fn set_reserve_price(&mut self, resource: ResourceAddress, price: u128) -> VibeResult<()>;
}

#[derive(Debug, Default)]
struct HostState {
    reserve_prices: BTreeMap<ResourceAddress, u128>,
    rejecting: bool,
}

/// In-memory participation host; clones share state
#[derive(Debug, Clone, Default)]
pub struct InMemoryParticipationHost {
    state: Arc<Mutex<HostState>>,
}

impl InMemoryParticipationHost {
    /// Create an empty host
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject (or resume accepting) subsequent updates
    pub fn set_rejecting(&self, rejecting: bool) {
        self.state.lock().rejecting = rejecting;
    }

    /// Reserve price last set for `resource`
    pub fn reserve_price(&self, resource: ResourceAddress) -> Option<u128> {
        self.state.lock().reserve_prices.get(&resource).copied()
    }
}

impl ParticipationHost for InMemoryParticipationHost {
    fn set_reserve_price(&mut self, resource: ResourceAddress, price: u128) -> VibeResult<()> {
        let mut state = self.state.lock();
        if state.rejecting {
            return Err(VibeError::invalid_input(format!(
                "participation resource {resource} rejected reserve price {price}"
            )));
        }
        state.reserve_prices.insert(resource, price);
        Ok(())
    }
}
