//! Global whitelist of principals with cross-entity authority.

use std::collections::BTreeSet;
use vibestream_core::{Principal, VibeError, VibeResult};

/// Set of principals authorized on every entity
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    members: BTreeSet<Principal>,
}

impl Whitelist {
    /// Create an empty whitelist
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or remove a single principal
    pub fn set(&mut self, principal: Principal, whitelisted: bool) -> VibeResult<()> {
        if principal.is_zero() {
            return Err(VibeError::invalid_input(
                "cannot whitelist the zero principal",
            ));
        }
        if whitelisted {
            self.members.insert(principal);
        } else {
            self.members.remove(&principal);
        }
        Ok(())
    }

    /// Apply the same membership to many principals
    ///
    /// Zero principals are skipped. Returns the principals that were applied.
    pub fn batch_set(&mut self, principals: &[Principal], whitelisted: bool) -> Vec<Principal> {
        let mut applied = Vec::with_capacity(principals.len());
        for &principal in principals {
            if principal.is_zero() {
                continue;
            }
            if whitelisted {
                self.members.insert(principal);
            } else {
                self.members.remove(&principal);
            }
            applied.push(principal);
        }
        applied
    }

    /// Whether `principal` is whitelisted
    pub fn contains(&self, principal: Principal) -> bool {
        self.members.contains(&principal)
    }

    /// Whitelisted principals in order
    pub fn members(&self) -> impl Iterator<Item = &Principal> {
        self.members.iter()
    }

    /// Number of whitelisted principals
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the whitelist is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
