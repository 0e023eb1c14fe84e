//! Delegation capability store
//!
//! A delegation capability grants one delegate standing authority over one
//! entity without transferring ownership. Capabilities are plain records in
//! an arena keyed by entity id; their identity is computed by the
//! deterministic deployer from `(entity_id, manager)` so it does not change
//! when the delegate does.
//!
//! The delegate itself lives in a separate table. The owner may rewrite it
//! at any time, with or without a capability having been created.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;
use vibestream_core::{
    EntityId, OwnershipOracle, Principal, ResourceAddress, ResourceLabel, VibeError, VibeResult,
};
use vibestream_registry::{encode_constructor_args, Deployer};

/// A created delegation capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationCapability {
    /// Entity the capability covers
    pub entity_id: EntityId,
    /// Deterministic identity of the capability
    pub proxy_identity: ResourceAddress,
    /// Current delegate; follows every [`DelegationStore::update_delegate`]
    pub delegate: Principal,
    /// Principal that requested creation (owner or trusted wrapper)
    pub created_by: Principal,
}

/// Who is asking for a capability to be created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityOrigin {
    /// The entity's current owner, acting directly
    Owner {
        /// Requesting principal
        caller: Principal,
    },
    /// A creation wrapper acting on behalf of a creator
    Wrapper {
        /// Requesting principal
        caller: Principal,
        /// Wrapper currently trusted by the manager
        trusted_wrapper: Option<Principal>,
        /// Creator the wrapper claims to act for
        creator: Principal,
    },
}

/// Arena of delegation capabilities and the delegate table
pub struct DelegationStore {
    manager: Principal,
    deployer: Arc<dyn Deployer>,
    capabilities: BTreeMap<EntityId, DelegationCapability>,
    delegates: BTreeMap<EntityId, Principal>,
}

impl std::fmt::Debug for DelegationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegationStore")
            .field("manager", &self.manager)
            .field("capabilities", &self.capabilities)
            .field("delegates", &self.delegates)
            .finish_non_exhaustive()
    }
}

impl DelegationStore {
    /// Create an empty store for the manager identified by `manager`
    pub fn new(manager: Principal, deployer: Arc<dyn Deployer>) -> Self {
        Self {
            manager,
            deployer,
            capabilities: BTreeMap::new(),
            delegates: BTreeMap::new(),
        }
    }

    /// Identity the capability for `entity_id` has (or would have)
    pub fn proxy_identity(&self, entity_id: EntityId) -> VibeResult<ResourceAddress> {
        let args = encode_constructor_args(&(entity_id, self.manager))?;
        Ok(self
            .deployer
            .compute_address(entity_id, ResourceLabel::Delegation, &args))
    }

    /// Create the capability for `entity_id`; at most once per entity
    pub fn create_capability(
        &mut self,
        owners: &dyn OwnershipOracle,
        entity_id: EntityId,
        origin: CapabilityOrigin,
        delegate: Principal,
    ) -> VibeResult<DelegationCapability> {
        let owner = owners
            .owner_of(entity_id)
            .ok_or_else(|| VibeError::unknown_entity(entity_id))?;

        let created_by = match origin {
            CapabilityOrigin::Owner { caller } => {
                if caller != owner {
                    return Err(VibeError::NotPrimaryOwner { entity_id, caller });
                }
                caller
            }
            CapabilityOrigin::Wrapper {
                caller,
                trusted_wrapper,
                creator,
            } => {
                if trusted_wrapper != Some(caller) || caller.is_zero() {
                    warn!(entity_id = %entity_id, caller = %caller, "Untrusted wrapper requested a capability");
                    return Err(VibeError::unauthorized(format!(
                        "{caller} is not the trusted creation wrapper"
                    )));
                }
                if owner != creator {
                    warn!(
                        entity_id = %entity_id,
                        claimed_creator = %creator,
                        owner = %owner,
                        "Wrapper capability request does not match the owner"
                    );
                    return Err(VibeError::NotPrimaryOwner {
                        entity_id,
                        caller: creator,
                    });
                }
                caller
            }
        };

        if self.capabilities.contains_key(&entity_id) {
            return Err(VibeError::AlreadyDeployed {
                entity_id,
                label: ResourceLabel::Delegation,
            });
        }
        if delegate.is_zero() {
            return Err(VibeError::invalid_input("delegate must not be the zero principal"));
        }

        let args = encode_constructor_args(&(entity_id, self.manager))?;
        let proxy_identity = self
            .deployer
            .deploy(entity_id, ResourceLabel::Delegation, &args);
        if proxy_identity.is_zero() || proxy_identity == self.deployer.identity() {
            warn!(entity_id = %entity_id, "Deployer returned an unusable capability identity");
            return Err(VibeError::DeploymentFailed {
                entity_id,
                label: ResourceLabel::Delegation,
            });
        }

        let capability = DelegationCapability {
            entity_id,
            proxy_identity,
            delegate,
            created_by,
        };
        self.capabilities.insert(entity_id, capability.clone());
        self.delegates.insert(entity_id, delegate);
        Ok(capability)
    }

    /// Replace the delegate for `entity_id`; owner only
    ///
    /// Works with or without a capability; an existing capability keeps its
    /// identity and reports the new delegate. Returns the previous delegate.
    pub fn update_delegate(
        &mut self,
        owners: &dyn OwnershipOracle,
        entity_id: EntityId,
        caller: Principal,
        delegate: Principal,
    ) -> VibeResult<Option<Principal>> {
        let owner = owners
            .owner_of(entity_id)
            .ok_or_else(|| VibeError::unknown_entity(entity_id))?;
        if caller != owner {
            return Err(VibeError::NotPrimaryOwner { entity_id, caller });
        }
        if delegate.is_zero() {
            return Err(VibeError::invalid_input("delegate must not be the zero principal"));
        }
        if let Some(capability) = self.capabilities.get_mut(&entity_id) {
            capability.delegate = delegate;
        }
        Ok(self.delegates.insert(entity_id, delegate))
    }

    /// Standing delegate for `entity_id`
    pub fn delegate_of(&self, entity_id: EntityId) -> Option<Principal> {
        self.delegates.get(&entity_id).copied()
    }

    /// Capability for `entity_id`, if created
    pub fn capability(&self, entity_id: EntityId) -> Option<&DelegationCapability> {
        self.capabilities.get(&entity_id)
    }

    /// Number of capabilities created
    pub fn capability_count(&self) -> usize {
        self.capabilities.len()
    }
}
