//! Downstream registration service
//!
//! External indexers learn about new entities and participation activations
//! through this interface. A rejected notification aborts the operation
//! that produced it; the registry restores its prior state before surfacing
//! the error.

use crate::errors::{VibeError, VibeResult};
use crate::identifiers::{EntityId, Principal, ResourceAddress};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Receiver of registry notifications
pub trait RegistrationService: Send {
    /// Record that a new entity exists
    fn register_entity(&mut self, entity_id: EntityId, creator: Principal) -> VibeResult<()>;

    /// Record that an entity's participation resource was activated
    fn activate_participation_resource(
        &mut self,
        entity_id: EntityId,
        resource: ResourceAddress,
    ) -> VibeResult<()>;
}

/// Registration service that accepts and discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRegistrationService;

impl RegistrationService for NoopRegistrationService {
    fn register_entity(&mut self, _entity_id: EntityId, _creator: Principal) -> VibeResult<()> {
        Ok(())
    }

    fn activate_participation_resource(
        &mut self,
        _entity_id: EntityId,
        _resource: ResourceAddress,
    ) -> VibeResult<()> {
        Ok(())
    }
}

/// A notification accepted by [`InMemoryRegistrationService`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationNotice {
    /// Entity registered
    Entity {
        /// Registered entity
        entity_id: EntityId,
        /// Its creator
        creator: Principal,
    },
    /// Participation resource activated
    Participation {
        /// Entity the resource belongs to
        entity_id: EntityId,
        /// The activated resource
        resource: ResourceAddress,
    },
}

#[derive(Debug, Default)]
struct RegistrationState {
    notices: Vec<RegistrationNotice>,
    rejecting: bool,
}

/// In-memory registration service
///
/// Clones share state, so a caller can hand one clone to the registry and
/// inspect accepted notices through another. Rejection can be toggled to
/// exercise rollback paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistrationService {
    state: Arc<Mutex<RegistrationState>>,
}

impl InMemoryRegistrationService {
    /// Create an empty service that accepts notifications
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject (or resume accepting) subsequent notifications
    pub fn set_rejecting(&self, rejecting: bool) {
        self.state.lock().rejecting = rejecting;
    }

    /// Notifications accepted so far
    pub fn notices(&self) -> Vec<RegistrationNotice> {
        self.state.lock().notices.clone()
    }

    fn accept(&self, notice: RegistrationNotice) -> VibeResult<()> {
        let mut state = self.state.lock();
        if state.rejecting {
            return Err(VibeError::registration(format!(
                "registration service unavailable for {notice:?}"
            )));
        }
        state.notices.push(notice);
        Ok(())
    }
}

impl RegistrationService for InMemoryRegistrationService {
    fn register_entity(&mut self, entity_id: EntityId, creator: Principal) -> VibeResult<()> {
        self.accept(RegistrationNotice::Entity { entity_id, creator })
    }

    fn activate_participation_resource(
        &mut self,
        entity_id: EntityId,
        resource: ResourceAddress,
    ) -> VibeResult<()> {
        self.accept(RegistrationNotice::Participation {
            entity_id,
            resource,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_notices() {
        let service = InMemoryRegistrationService::new();
        let mut handle = service.clone();
        handle
            .register_entity(EntityId::new(0), Principal::derive("alice"))
            .unwrap();
        assert_eq!(service.notices().len(), 1);
    }

    #[test]
    fn test_rejecting_records_nothing() {
        let service = InMemoryRegistrationService::new();
        service.set_rejecting(true);
        let mut handle = service.clone();
        let err = handle
            .activate_participation_resource(EntityId::new(0), ResourceAddress::ZERO)
            .unwrap_err();
        assert!(matches!(err, VibeError::Registration { .. }));
        assert!(service.notices().is_empty());
    }
}
