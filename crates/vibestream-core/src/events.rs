//! Append-only audit log of registry and authorization events.

use crate::identifiers::{EntityId, Principal, ResourceAddress};
use serde::{Deserialize, Serialize};

/// Event emitted by a committed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VibestreamEvent {
    /// A new entity and its ticket resource were recorded
    EntityCreated {
        /// Newly assigned id
        entity_id: EntityId,
        /// Creator and initial owner
        creator: Principal,
        /// Deployed ticket resource
        ticket_resource: ResourceAddress,
    },
    /// The creator activated the participation resource
    ParticipationResourceActivated {
        /// Entity the resource belongs to
        entity_id: EntityId,
        /// Deployed participation resource
        participation_resource: ResourceAddress,
    },
    /// Metadata URI replaced
    MetadataUpdated {
        /// Updated entity
        entity_id: EntityId,
        /// New metadata URI
        metadata_uri: String,
    },
    /// Entity reached its terminal state
    EntityFinalized {
        /// Finalized entity
        entity_id: EntityId,
    },
    /// Primary ownership moved to another principal
    OwnershipTransferred {
        /// Transferred entity
        entity_id: EntityId,
        /// Previous owner
        from: Principal,
        /// New owner
        to: Principal,
    },
    /// The registry was bound to its authorization manager
    ManagerInitialized {
        /// Manager principal allowed to mutate records
        manager: Principal,
    },
    /// A delegation capability was created for an entity
    DelegationCapabilityCreated {
        /// Entity the capability covers
        entity_id: EntityId,
        /// Identity of the capability
        proxy_identity: ResourceAddress,
        /// Delegate at creation time
        delegate: Principal,
    },
    /// The standing delegate for an entity changed
    DelegateUpdated {
        /// Entity the delegate acts on
        entity_id: EntityId,
        /// New delegate
        delegate: Principal,
    },
    /// Whitelist membership toggled
    WhitelistUpdated {
        /// Affected principal
        principal: Principal,
        /// Membership after the update
        whitelisted: bool,
    },
    /// Trusted creation wrapper changed
    CreationWrapperUpdated {
        /// New wrapper, `None` when cleared
        wrapper: Option<Principal>,
    },
    /// Reserve price forwarded to the participation resource
    ReservePriceUpdated {
        /// Entity whose participation resource was updated
        entity_id: EntityId,
        /// New reserve price
        reserve_price: u128,
    },
}

impl VibestreamEvent {
    /// Entity the event is indexed by, if any
    pub fn entity_id(&self) -> Option<EntityId> {
        match self {
            VibestreamEvent::EntityCreated { entity_id, .. }
            | VibestreamEvent::ParticipationResourceActivated { entity_id, .. }
            | VibestreamEvent::MetadataUpdated { entity_id, .. }
            | VibestreamEvent::EntityFinalized { entity_id }
            | VibestreamEvent::OwnershipTransferred { entity_id, .. }
            | VibestreamEvent::DelegationCapabilityCreated { entity_id, .. }
            | VibestreamEvent::DelegateUpdated { entity_id, .. }
            | VibestreamEvent::ReservePriceUpdated { entity_id, .. } => Some(*entity_id),
            VibestreamEvent::ManagerInitialized { .. }
            | VibestreamEvent::WhitelistUpdated { .. }
            | VibestreamEvent::CreationWrapperUpdated { .. } => None,
        }
    }
}

/// An event with its position in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at zero
    pub sequence: u64,
    /// The event
    pub event: VibestreamEvent,
}

/// Append-only event log
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return its sequence number
    pub fn emit(&mut self, event: VibestreamEvent) -> u64 {
        let sequence = self.records.len() as u64;
        self.records.push(EventRecord { sequence, event });
        sequence
    }

    /// All records in emission order
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records at or after `sequence`, for incremental indexing
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    /// Events indexed by the given entity
    pub fn for_entity(&self, entity_id: EntityId) -> impl Iterator<Item = &VibestreamEvent> {
        self.records
            .iter()
            .map(|record| &record.event)
            .filter(move |event| event.entity_id() == Some(entity_id))
    }

    /// The most recent event
    pub fn last(&self) -> Option<&VibestreamEvent> {
        self.records.last().map(|record| &record.event)
    }

    /// Number of events recorded
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no events have been recorded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn since_returns_suffix(ids in prop::collection::vec(0u64..8, 0..32), from in 0u64..40) {
            let mut log = EventLog::new();
            for id in &ids {
                log.emit(VibestreamEvent::EntityFinalized { entity_id: EntityId::new(*id) });
            }

            let suffix = log.since(from);
            prop_assert_eq!(suffix.len(), ids.len().saturating_sub(from as usize));
            for (offset, record) in suffix.iter().enumerate() {
                prop_assert_eq!(record.sequence, from + offset as u64);
            }
        }
    }

    #[test]
    fn test_sequence_numbers_are_dense() {
        let mut log = EventLog::new();
        let first = log.emit(VibestreamEvent::EntityFinalized {
            entity_id: EntityId::new(0),
        });
        let second = log.emit(VibestreamEvent::CreationWrapperUpdated { wrapper: None });
        assert_eq!((first, second), (0, 1));
        assert_eq!(log.since(1).len(), 1);
        assert!(log.since(10).is_empty());
    }

    #[test]
    fn test_for_entity_filters_global_events() {
        let mut log = EventLog::new();
        let entity_id = EntityId::new(4);
        log.emit(VibestreamEvent::WhitelistUpdated {
            principal: Principal::derive("w"),
            whitelisted: true,
        });
        log.emit(VibestreamEvent::MetadataUpdated {
            entity_id,
            metadata_uri: "ipfs://x".into(),
        });
        log.emit(VibestreamEvent::EntityFinalized {
            entity_id: EntityId::new(5),
        });
        assert_eq!(log.for_entity(entity_id).count(), 1);
    }

    #[test]
    fn test_event_json_shape() {
        let event = VibestreamEvent::DelegateUpdated {
            entity_id: EntityId::new(1),
            delegate: Principal::from_bytes([0xab; 20]),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["DelegateUpdated"]["entity_id"], 1);
        assert_eq!(
            json["DelegateUpdated"]["delegate"],
            format!("0x{}", "ab".repeat(20))
        );
    }
}
