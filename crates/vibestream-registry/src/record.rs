//! Entity records and creation parameters.

use serde::{Deserialize, Serialize};
use vibestream_core::{EntityId, Principal, ResourceAddress};

/// Constructor parameters for an entity's ticket resource
///
/// Opaque to the registry beyond being part of the deterministic address.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TicketParams {
    /// Number of tickets issued
    pub ticket_count: u32,
    /// Price per ticket
    pub ticket_price: u128,
    /// Whether tickets are distributed rather than sold
    pub distribute_tickets: bool,
}

/// Parameters shared by both creation entry points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateParams {
    /// Start timestamp, must fit the configured width
    pub start_date: u128,
    /// Initial metadata URI
    pub metadata_uri: String,
    /// Free-form mode, immutable after creation
    pub mode: String,
    /// Ticket resource constructor parameters
    pub ticket_params: TicketParams,
}

impl CreateParams {
    /// Parameters with default ticketing
    pub fn new(start_date: u128, metadata_uri: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            start_date,
            metadata_uri: metadata_uri.into(),
            mode: mode.into(),
            ticket_params: TicketParams::default(),
        }
    }

    /// Replace the ticket parameters
    pub fn with_tickets(mut self, ticket_params: TicketParams) -> Self {
        self.ticket_params = ticket_params;
        self
    }
}

/// Canonical ledger entry for one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Sequential id
    pub id: EntityId,
    /// Principal the entity was created for; never changes
    pub creator: Principal,
    /// Ticket resource deployed at creation
    pub ticket_resource: ResourceAddress,
    /// Participation resource, set at most once after creation
    pub participation_resource: Option<ResourceAddress>,
    /// Validated start timestamp
    pub start_date: u128,
    /// Terminal flag, false until finalization
    pub finalized: bool,
    /// Mutable until finalization
    pub metadata_uri: String,
    /// Fixed at creation
    pub mode: String,
}
