//! Authorization manager
//!
//! Every mutating request on an entity passes through one resolution
//! routine. Authority is granted when the caller is
//!
//! 1. the entity's current owner, or
//! 2. the entity's standing delegate, or
//! 3. a member of the global whitelist.
//!
//! On success the manager forwards the mutation to the registry under its
//! own identity, which is the only identity the registry accepts for record
//! mutation. Whitelist and creation-wrapper administration is reserved for
//! the system owner.
//!
//! The manager keeps no log of its own. Its events are appended to the
//! registry's audit log under the same lock as the operation, so one
//! sequence orders every event in the system.

use crate::delegation::{CapabilityOrigin, DelegationCapability, DelegationStore};
use crate::whitelist::Whitelist;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vibestream_core::{
    EntityId, EventLog, OwnershipOracle, ParticipationHost, Principal, ResourceAddress,
    VibeError, VibeResult, VibestreamEvent,
};
use vibestream_registry::{Deployer, Registry, SharedRegistry};

/// Tier through which a caller was authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authority {
    /// Current owner of the entity
    Owner,
    /// Standing delegate of the entity
    Delegate,
    /// Member of the global whitelist
    Whitelisted,
}

/// Central permission resolver and mutation forwarder
pub struct AuthorizationManager {
    identity: Principal,
    system_owner: Principal,
    registry: SharedRegistry,
    delegations: DelegationStore,
    whitelist: Whitelist,
    creation_wrapper: Option<Principal>,
    participation: Box<dyn ParticipationHost>,
}

impl std::fmt::Debug for AuthorizationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationManager")
            .field("identity", &self.identity)
            .field("system_owner", &self.system_owner)
            .field("whitelist", &self.whitelist)
            .field("creation_wrapper", &self.creation_wrapper)
            .finish_non_exhaustive()
    }
}

impl AuthorizationManager {
    /// Create a manager acting as `identity` over `registry`
    ///
    /// The registry must be initialized with the same identity for forwarded
    /// mutations to be accepted.
    pub fn new(
        identity: Principal,
        system_owner: Principal,
        registry: SharedRegistry,
        deployer: Arc<dyn Deployer>,
        participation: Box<dyn ParticipationHost>,
    ) -> Self {
        Self {
            identity,
            system_owner,
            registry,
            delegations: DelegationStore::new(identity, deployer),
            whitelist: Whitelist::new(),
            creation_wrapper: None,
            participation,
        }
    }

    /// Start with a trusted creation wrapper
    pub fn with_creation_wrapper(mut self, wrapper: Option<Principal>) -> Self {
        self.creation_wrapper = wrapper.filter(|w| !w.is_zero());
        self
    }

    /// Resolve which tier, if any, authorizes `caller` on `entity_id`
    ///
    /// Locks the registry. A caller already holding the registry lock must
    /// use [`Self::resolve_authority_in`] instead.
    pub fn resolve_authority(
        &self,
        caller: Principal,
        entity_id: EntityId,
    ) -> VibeResult<Option<Authority>> {
        let registry = self.registry.lock();
        self.resolve_authority_in(&registry, caller, entity_id)
    }

    /// Resolve authority against a registry the caller has already locked
    pub fn resolve_authority_in(
        &self,
        registry: &Registry,
        caller: Principal,
        entity_id: EntityId,
    ) -> VibeResult<Option<Authority>> {
        registry.entity(entity_id)?;
        let authority = if registry.is_owner(entity_id, caller) {
            Some(Authority::Owner)
        } else if self.delegations.delegate_of(entity_id) == Some(caller) {
            Some(Authority::Delegate)
        } else if self.whitelist.contains(caller) {
            Some(Authority::Whitelisted)
        } else {
            None
        };
        Ok(authority)
    }

    fn authorize(
        &self,
        registry: &Registry,
        caller: Principal,
        entity_id: EntityId,
    ) -> VibeResult<Authority> {
        match self.resolve_authority_in(registry, caller, entity_id)? {
            Some(authority) => {
                debug!(entity_id = %entity_id, caller = %caller, ?authority, "Authorized");
                Ok(authority)
            }
            None => {
                warn!(entity_id = %entity_id, caller = %caller, "Unauthorized mutation attempt");
                Err(VibeError::unauthorized(format!(
                    "{caller} holds no authority over {entity_id}"
                )))
            }
        }
    }

    fn ensure_system_owner(&self, caller: Principal) -> VibeResult<()> {
        if caller == self.system_owner {
            Ok(())
        } else {
            warn!(caller = %caller, "Administrative call from non-owner");
            Err(VibeError::unauthorized(format!(
                "{caller} is not the system owner"
            )))
        }
    }

    fn ensure_open(registry: &Registry, entity_id: EntityId) -> VibeResult<()> {
        if registry.is_finalized(entity_id)? {
            return Err(VibeError::AlreadyFinalized { entity_id });
        }
        Ok(())
    }

    /// Replace an entity's metadata URI
    pub fn update_metadata(
        &mut self,
        caller: Principal,
        entity_id: EntityId,
        metadata_uri: impl Into<String>,
    ) -> VibeResult<()> {
        let shared = Arc::clone(&self.registry);
        let mut registry = shared.lock();
        self.authorize(&registry, caller, entity_id)?;
        registry.set_metadata_uri(entity_id, self.identity, metadata_uri)
    }

    /// Forward a reserve price to the entity's participation resource
    pub fn update_reserve_price(
        &mut self,
        caller: Principal,
        entity_id: EntityId,
        reserve_price: u128,
    ) -> VibeResult<()> {
        let shared = Arc::clone(&self.registry);
        let mut registry = shared.lock();
        registry.ensure_manager(self.identity)?;
        self.authorize(&registry, caller, entity_id)?;
        Self::ensure_open(&registry, entity_id)?;
        let resource = registry.participation_resource(entity_id)?.ok_or_else(|| {
            VibeError::not_found(format!("{entity_id} has no participation resource"))
        })?;

        self.participation
            .set_reserve_price(resource, reserve_price)?;
        registry.append_event(
            self.identity,
            VibestreamEvent::ReservePriceUpdated {
                entity_id,
                reserve_price,
            },
        )?;
        debug!(entity_id = %entity_id, reserve_price, "Reserve price updated");
        Ok(())
    }

    /// Irreversibly finalize an entity
    pub fn finalize(&mut self, caller: Principal, entity_id: EntityId) -> VibeResult<()> {
        let shared = Arc::clone(&self.registry);
        let mut registry = shared.lock();
        let authority = self.authorize(&registry, caller, entity_id)?;
        registry.finalize(entity_id, self.identity)?;
        info!(entity_id = %entity_id, caller = %caller, ?authority, "Finalization forwarded");
        Ok(())
    }

    /// Create the delegation capability for an entity the caller owns
    pub fn create_delegation_capability(
        &mut self,
        caller: Principal,
        entity_id: EntityId,
        delegate: Principal,
    ) -> VibeResult<DelegationCapability> {
        self.create_capability(entity_id, CapabilityOrigin::Owner { caller }, delegate)
    }

    /// Create the delegation capability on behalf of `creator`
    ///
    /// Only the trusted creation wrapper may call this, and only for an
    /// entity `creator` actually owns.
    pub fn create_delegation_capability_for(
        &mut self,
        caller: Principal,
        entity_id: EntityId,
        creator: Principal,
        delegate: Principal,
    ) -> VibeResult<DelegationCapability> {
        let origin = CapabilityOrigin::Wrapper {
            caller,
            trusted_wrapper: self.creation_wrapper,
            creator,
        };
        self.create_capability(entity_id, origin, delegate)
    }

    fn create_capability(
        &mut self,
        entity_id: EntityId,
        origin: CapabilityOrigin,
        delegate: Principal,
    ) -> VibeResult<DelegationCapability> {
        let shared = Arc::clone(&self.registry);
        let mut registry = shared.lock();
        registry.ensure_manager(self.identity)?;
        Self::ensure_open(&registry, entity_id)?;

        let capability =
            self.delegations
                .create_capability(&*registry, entity_id, origin, delegate)?;
        registry.append_event(
            self.identity,
            VibestreamEvent::DelegationCapabilityCreated {
                entity_id,
                proxy_identity: capability.proxy_identity,
                delegate,
            },
        )?;
        info!(
            entity_id = %entity_id,
            proxy_identity = %capability.proxy_identity,
            delegate = %delegate,
            created_by = %capability.created_by,
            "Delegation capability created"
        );
        Ok(capability)
    }

    /// Reassign the standing delegate of an entity the caller owns
    pub fn update_delegate(
        &mut self,
        caller: Principal,
        entity_id: EntityId,
        delegate: Principal,
    ) -> VibeResult<()> {
        let shared = Arc::clone(&self.registry);
        let mut registry = shared.lock();
        registry.ensure_manager(self.identity)?;
        Self::ensure_open(&registry, entity_id)?;

        let previous = self
            .delegations
            .update_delegate(&*registry, entity_id, caller, delegate)?;
        registry.append_event(
            self.identity,
            VibestreamEvent::DelegateUpdated { entity_id, delegate },
        )?;
        info!(entity_id = %entity_id, delegate = %delegate, previous = ?previous, "Delegate updated");
        Ok(())
    }

    /// Add or remove a whitelist member; system owner only
    pub fn set_whitelist(
        &mut self,
        caller: Principal,
        principal: Principal,
        whitelisted: bool,
    ) -> VibeResult<()> {
        self.ensure_system_owner(caller)?;
        let shared = Arc::clone(&self.registry);
        let mut registry = shared.lock();
        registry.ensure_manager(self.identity)?;

        self.whitelist.set(principal, whitelisted)?;
        registry.append_event(
            self.identity,
            VibestreamEvent::WhitelistUpdated {
                principal,
                whitelisted,
            },
        )?;
        info!(principal = %principal, whitelisted, "Whitelist updated");
        Ok(())
    }

    /// Apply one membership to many principals; system owner only
    ///
    /// Zero principals are skipped. Returns how many entries were applied.
    pub fn batch_set_whitelist(
        &mut self,
        caller: Principal,
        principals: &[Principal],
        whitelisted: bool,
    ) -> VibeResult<usize> {
        self.ensure_system_owner(caller)?;
        let shared = Arc::clone(&self.registry);
        let mut registry = shared.lock();
        registry.ensure_manager(self.identity)?;

        let applied = self.whitelist.batch_set(principals, whitelisted);
        for principal in &applied {
            registry.append_event(
                self.identity,
                VibestreamEvent::WhitelistUpdated {
                    principal: *principal,
                    whitelisted,
                },
            )?;
        }
        info!(
            applied = applied.len(),
            skipped = principals.len() - applied.len(),
            whitelisted,
            "Whitelist batch applied"
        );
        Ok(applied.len())
    }

    /// Set the trusted creation wrapper; the zero principal clears it
    pub fn set_creation_wrapper(&mut self, caller: Principal, wrapper: Principal) -> VibeResult<()> {
        self.ensure_system_owner(caller)?;
        let shared = Arc::clone(&self.registry);
        let mut registry = shared.lock();
        registry.ensure_manager(self.identity)?;

        let wrapper = (!wrapper.is_zero()).then_some(wrapper);
        self.creation_wrapper = wrapper;
        registry.append_event(
            self.identity,
            VibestreamEvent::CreationWrapperUpdated { wrapper },
        )?;
        info!(wrapper = ?wrapper, "Creation wrapper updated");
        Ok(())
    }

    /// Principal the manager acts as toward the registry
    pub fn identity(&self) -> Principal {
        self.identity
    }

    /// System owner
    pub fn system_owner(&self) -> Principal {
        self.system_owner
    }

    /// Shared registry handle
    ///
    /// The lock is not reentrant: release any guard taken from this handle
    /// before calling a manager method that locks the registry itself.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Whether `principal` is whitelisted
    pub fn is_whitelisted(&self, principal: Principal) -> bool {
        self.whitelist.contains(principal)
    }

    /// Standing delegate for `entity_id`
    pub fn delegate_of(&self, entity_id: EntityId) -> Option<Principal> {
        self.delegations.delegate_of(entity_id)
    }

    /// Delegation capability for `entity_id`, with its current delegate
    pub fn capability(&self, entity_id: EntityId) -> Option<&DelegationCapability> {
        self.delegations.capability(entity_id)
    }

    /// Identity the delegation capability for `entity_id` has or would have
    pub fn capability_identity(&self, entity_id: EntityId) -> VibeResult<ResourceAddress> {
        self.delegations.proxy_identity(entity_id)
    }

    /// Trusted creation wrapper
    pub fn creation_wrapper(&self) -> Option<Principal> {
        self.creation_wrapper
    }

    /// Whitelist
    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Snapshot of the audit log shared with the registry
    pub fn events(&self) -> EventLog {
        self.registry.lock().events().clone()
    }
}
