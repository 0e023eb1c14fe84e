//! Ownership oracle interface.

use crate::identifiers::{EntityId, Principal};

/// Authoritative answer to "who owns entity N"
pub trait OwnershipOracle {
    /// Current owner, or `None` if the entity was never minted
    fn owner_of(&self, entity_id: EntityId) -> Option<Principal>;

    /// Whether `principal` currently owns `entity_id`
    fn is_owner(&self, entity_id: EntityId, principal: Principal) -> bool {
        self.owner_of(entity_id) == Some(principal)
    }
}
