//! Ownership component
//!
//! Standalone token-ownership table consumed by the registry through
//! composition. The registry is its only writer: it mints at creation,
//! mirrors metadata URIs, and exposes transfers.

use std::collections::BTreeMap;
use vibestream_core::{EntityId, OwnershipOracle, Principal, VibeError, VibeResult};

/// Owner and URI storage per entity
#[derive(Debug, Clone, Default)]
pub struct OwnershipLedger {
    owners: BTreeMap<EntityId, Principal>,
    uris: BTreeMap<EntityId, String>,
    balances: BTreeMap<Principal, u64>,
}

impl OwnershipLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint `entity_id` to `owner` with an initial URI
    pub fn mint(&mut self, entity_id: EntityId, owner: Principal, uri: &str) -> VibeResult<()> {
        if owner.is_zero() {
            return Err(VibeError::invalid_input("cannot mint to the zero principal"));
        }
        if self.owners.contains_key(&entity_id) {
            return Err(VibeError::invalid_input(format!(
                "{entity_id} is already minted"
            )));
        }
        self.owners.insert(entity_id, owner);
        self.uris.insert(entity_id, uri.to_string());
        *self.balances.entry(owner).or_default() += 1;
        Ok(())
    }

    /// Undo a mint that belongs to an operation being rolled back
    pub(crate) fn revert_mint(&mut self, entity_id: EntityId) {
        if let Some(owner) = self.owners.remove(&entity_id) {
            self.uris.remove(&entity_id);
            self.debit(owner);
        }
    }

    /// Replace the URI of a minted entity
    pub fn set_uri(&mut self, entity_id: EntityId, uri: &str) -> VibeResult<()> {
        match self.uris.get_mut(&entity_id) {
            Some(current) => {
                *current = uri.to_string();
                Ok(())
            }
            None => Err(VibeError::unknown_entity(entity_id)),
        }
    }

    /// URI of a minted entity
    pub fn token_uri(&self, entity_id: EntityId) -> Option<&str> {
        self.uris.get(&entity_id).map(String::as_str)
    }

    /// Number of entities owned by `owner`
    pub fn balance_of(&self, owner: Principal) -> u64 {
        self.balances.get(&owner).copied().unwrap_or(0)
    }

    /// Move ownership from `from` to `to`
    pub fn transfer(&mut self, entity_id: EntityId, from: Principal, to: Principal) -> VibeResult<()> {
        let current = self
            .owners
            .get(&entity_id)
            .copied()
            .ok_or_else(|| VibeError::unknown_entity(entity_id))?;
        if current != from {
            return Err(VibeError::NotPrimaryOwner {
                entity_id,
                caller: from,
            });
        }
        if to.is_zero() {
            return Err(VibeError::invalid_input("cannot transfer to the zero principal"));
        }
        self.owners.insert(entity_id, to);
        self.debit(from);
        *self.balances.entry(to).or_default() += 1;
        Ok(())
    }

    fn debit(&mut self, owner: Principal) {
        if let Some(balance) = self.balances.get_mut(&owner) {
            *balance -= 1;
            if *balance == 0 {
                self.balances.remove(&owner);
            }
        }
    }
}

impl OwnershipOracle for OwnershipLedger {
    fn owner_of(&self, entity_id: EntityId) -> Option<Principal> {
        self.owners.get(&entity_id).copied()
    }
}
