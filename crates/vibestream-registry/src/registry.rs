//! Entity ledger
//!
//! The registry owns the canonical [`EntityRecord`] table, the ownership
//! component and the set of recorded deployments. Record mutation is
//! reserved for the authorization manager bound at bootstrap; creation and
//! participation activation are open to creators directly.
//!
//! # Operation ordering
//!
//! Every operation validates first, then commits its own state, then calls
//! external collaborators. If a collaborator rejects the call, the committed
//! state is reverted before the error is returned, so a failed operation is
//! never observable. Events are appended only once the whole operation has
//! succeeded.

use crate::deployer::{encode_constructor_args, Create2Deployer, Deployer};
use crate::ownership::OwnershipLedger;
use crate::record::{CreateParams, EntityRecord};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vibestream_core::{
    EntityId, EventLog, OwnershipOracle, Principal, RegistrationService, RegistryConfig,
    ResourceAddress, ResourceLabel, VibeError, VibeResult, VibestreamEvent,
};

/// Registry handle shared with the authorization manager
///
/// The mutex serializes every request against the ledger.
pub type SharedRegistry = Arc<Mutex<Registry>>;

/// Canonical ledger of entity records
pub struct Registry {
    config: RegistryConfig,
    system_owner: Principal,
    manager: Option<Principal>,
    records: Vec<EntityRecord>,
    by_creator: BTreeMap<Principal, Vec<EntityId>>,
    deployments: BTreeSet<(EntityId, ResourceLabel)>,
    ownership: OwnershipLedger,
    deployer: Arc<dyn Deployer>,
    registration: Box<dyn RegistrationService>,
    events: EventLog,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("system_owner", &self.system_owner)
            .field("manager", &self.manager)
            .field("count", &self.records.len())
            .field("deployer", &self.deployer.identity())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Create an empty registry administered by `system_owner`
    pub fn new(
        config: RegistryConfig,
        system_owner: Principal,
        registration: Box<dyn RegistrationService>,
    ) -> Self {
        let deployer = Arc::new(Create2Deployer::new(config.deployer_domain.clone()));
        Self {
            config,
            system_owner,
            manager: None,
            records: Vec::new(),
            by_creator: BTreeMap::new(),
            deployments: BTreeSet::new(),
            ownership: OwnershipLedger::new(),
            deployer,
            registration,
            events: EventLog::new(),
        }
    }

    /// Replace the deterministic deployer
    pub fn with_deployer(mut self, deployer: Arc<dyn Deployer>) -> Self {
        self.deployer = deployer;
        self
    }

    /// Wrap the registry for sharing with the authorization manager
    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(Mutex::new(self))
    }

    /// Bind the authorization manager; callable once, by the system owner
    pub fn initialize(&mut self, caller: Principal, manager: Principal) -> VibeResult<()> {
        if caller != self.system_owner {
            warn!(caller = %caller, "Rejected registry initialization from non-owner");
            return Err(VibeError::unauthorized(
                "only the system owner may initialize the registry",
            ));
        }
        if let Some(existing) = self.manager {
            return Err(VibeError::already_initialized(format!(
                "registry is already bound to manager {existing}"
            )));
        }
        if manager.is_zero() {
            return Err(VibeError::invalid_input("manager must not be the zero principal"));
        }

        self.manager = Some(manager);
        self.events
            .emit(VibestreamEvent::ManagerInitialized { manager });
        info!(manager = %manager, "Registry bound to authorization manager");
        Ok(())
    }

    /// Create an entity with the caller as creator
    pub fn create(&mut self, caller: Principal, params: CreateParams) -> VibeResult<EntityId> {
        self.create_entity(caller, caller, params)
    }

    /// Create an entity on behalf of `creator`
    pub fn create_for(
        &mut self,
        caller: Principal,
        creator: Principal,
        params: CreateParams,
    ) -> VibeResult<EntityId> {
        self.create_entity(caller, creator, params)
    }

    fn create_entity(
        &mut self,
        initiator: Principal,
        creator: Principal,
        params: CreateParams,
    ) -> VibeResult<EntityId> {
        if creator.is_zero() {
            return Err(VibeError::invalid_input("creator must not be the zero principal"));
        }
        if params.start_date > self.config.max_start_date() {
            return Err(VibeError::invalid_input(format!(
                "start date {} does not fit in {} bits",
                params.start_date, self.config.start_date_bits
            )));
        }

        let entity_id = self.next_id();
        let args = encode_constructor_args(&(entity_id, creator, &params.ticket_params))?;
        let ticket_resource = self.resolve_deployment(entity_id, ResourceLabel::Ticket, &args)?;

        self.ownership
            .mint(entity_id, creator, &params.metadata_uri)?;
        self.records.push(EntityRecord {
            id: entity_id,
            creator,
            ticket_resource,
            participation_resource: None,
            start_date: params.start_date,
            finalized: false,
            metadata_uri: params.metadata_uri,
            mode: params.mode,
        });
        self.by_creator.entry(creator).or_default().push(entity_id);
        self.deployments.insert((entity_id, ResourceLabel::Ticket));

        if let Err(err) = self.registration.register_entity(entity_id, creator) {
            warn!(entity_id = %entity_id, error = %err, "Registration rejected; reverting creation");
            self.revert_create(entity_id, creator);
            return Err(err);
        }

        self.events.emit(VibestreamEvent::EntityCreated {
            entity_id,
            creator,
            ticket_resource,
        });
        info!(
            entity_id = %entity_id,
            creator = %creator,
            initiator = %initiator,
            ticket_resource = %ticket_resource,
            "Entity created"
        );
        Ok(entity_id)
    }

    fn revert_create(&mut self, entity_id: EntityId, creator: Principal) {
        self.records.pop();
        if let Some(ids) = self.by_creator.get_mut(&creator) {
            ids.pop();
            if ids.is_empty() {
                self.by_creator.remove(&creator);
            }
        }
        self.deployments.remove(&(entity_id, ResourceLabel::Ticket));
        self.ownership.revert_mint(entity_id);
    }

    /// Replace the metadata URI; manager only
    pub fn set_metadata_uri(
        &mut self,
        entity_id: EntityId,
        caller: Principal,
        metadata_uri: impl Into<String>,
    ) -> VibeResult<()> {
        self.ensure_manager(caller)?;
        let metadata_uri = metadata_uri.into();
        if self.entity(entity_id)?.finalized {
            return Err(VibeError::AlreadyFinalized { entity_id });
        }

        self.ownership.set_uri(entity_id, &metadata_uri)?;
        self.record_mut(entity_id)?
            .metadata_uri
            .clone_from(&metadata_uri);
        debug!(entity_id = %entity_id, metadata_uri = %metadata_uri, "Metadata updated");
        self.events.emit(VibestreamEvent::MetadataUpdated {
            entity_id,
            metadata_uri,
        });
        Ok(())
    }

    /// Irreversibly finalize an entity; manager only
    pub fn finalize(&mut self, entity_id: EntityId, caller: Principal) -> VibeResult<()> {
        self.ensure_manager(caller)?;
        let record = self.record_mut(entity_id)?;
        if record.finalized {
            return Err(VibeError::AlreadyFinalized { entity_id });
        }

        record.finalized = true;
        self.events
            .emit(VibestreamEvent::EntityFinalized { entity_id });
        info!(entity_id = %entity_id, "Entity finalized");
        Ok(())
    }

    /// Deploy the participation resource; creator only, at most once
    pub fn deploy_participation_resource(
        &mut self,
        entity_id: EntityId,
        caller: Principal,
    ) -> VibeResult<ResourceAddress> {
        let record = self.entity(entity_id)?;
        let creator = record.creator;
        if caller != creator {
            warn!(entity_id = %entity_id, caller = %caller, "Participation deploy by non-creator");
            return Err(VibeError::NotPrimaryOwner { entity_id, caller });
        }
        if record.participation_resource.is_some() {
            return Err(VibeError::AlreadyDeployed {
                entity_id,
                label: ResourceLabel::Participation,
            });
        }
        if record.finalized {
            return Err(VibeError::AlreadyFinalized { entity_id });
        }

        let args = encode_constructor_args(&(entity_id, creator))?;
        let address = self.resolve_deployment(entity_id, ResourceLabel::Participation, &args)?;

        self.record_mut(entity_id)?.participation_resource = Some(address);
        self.deployments
            .insert((entity_id, ResourceLabel::Participation));

        if let Err(err) = self
            .registration
            .activate_participation_resource(entity_id, address)
        {
            warn!(entity_id = %entity_id, error = %err, "Activation rejected; reverting deployment");
            self.record_mut(entity_id)?.participation_resource = None;
            self.deployments
                .remove(&(entity_id, ResourceLabel::Participation));
            return Err(err);
        }

        self.events
            .emit(VibestreamEvent::ParticipationResourceActivated {
                entity_id,
                participation_resource: address,
            });
        info!(entity_id = %entity_id, participation_resource = %address, "Participation resource activated");
        Ok(address)
    }

    /// Transfer primary ownership; the creator field is unaffected
    pub fn transfer_ownership(
        &mut self,
        entity_id: EntityId,
        caller: Principal,
        to: Principal,
    ) -> VibeResult<()> {
        self.entity(entity_id)?;
        self.ownership.transfer(entity_id, caller, to)?;
        self.events.emit(VibestreamEvent::OwnershipTransferred {
            entity_id,
            from: caller,
            to,
        });
        info!(entity_id = %entity_id, from = %caller, to = %to, "Ownership transferred");
        Ok(())
    }

    /// Append an authorization event to the shared audit log; manager only
    ///
    /// Registry and manager events share one sequence, so indexers can
    /// order delegation and whitelist changes against ledger transitions.
    pub fn append_event(&mut self, caller: Principal, event: VibestreamEvent) -> VibeResult<u64> {
        self.ensure_manager(caller)?;
        Ok(self.events.emit(event))
    }

    /// Checks one-shot deployment and computes the address. No state changes.
    fn resolve_deployment(
        &self,
        entity_id: EntityId,
        label: ResourceLabel,
        args: &[u8],
    ) -> VibeResult<ResourceAddress> {
        if self.deployments.contains(&(entity_id, label)) {
            return Err(VibeError::AlreadyDeployed { entity_id, label });
        }
        let address = self.deployer.deploy(entity_id, label, args);
        if address.is_zero() || address == self.deployer.identity() {
            warn!(entity_id = %entity_id, label = %label, "Deployer returned an unusable address");
            return Err(VibeError::DeploymentFailed { entity_id, label });
        }
        Ok(address)
    }

    /// Fail unless `caller` is the bound authorization manager
    pub fn ensure_manager(&self, caller: Principal) -> VibeResult<()> {
        match self.manager {
            Some(manager) if manager == caller => Ok(()),
            Some(_) => {
                warn!(caller = %caller, "Record mutation attempted outside the manager");
                Err(VibeError::unauthorized(format!(
                    "{caller} is not the authorization manager"
                )))
            }
            None => Err(VibeError::unauthorized(
                "registry has no authorization manager bound",
            )),
        }
    }

    fn record_mut(&mut self, entity_id: EntityId) -> VibeResult<&mut EntityRecord> {
        usize::try_from(entity_id.value())
            .ok()
            .and_then(|index| self.records.get_mut(index))
            .ok_or_else(|| VibeError::unknown_entity(entity_id))
    }

    fn next_id(&self) -> EntityId {
        EntityId::new(self.records.len() as u64)
    }

    /// Record for `entity_id`
    pub fn entity(&self, entity_id: EntityId) -> VibeResult<&EntityRecord> {
        usize::try_from(entity_id.value())
            .ok()
            .and_then(|index| self.records.get(index))
            .ok_or_else(|| VibeError::unknown_entity(entity_id))
    }

    /// Ticket resource of `entity_id`
    pub fn ticket_resource(&self, entity_id: EntityId) -> VibeResult<ResourceAddress> {
        Ok(self.entity(entity_id)?.ticket_resource)
    }

    /// Participation resource of `entity_id`, if activated
    pub fn participation_resource(
        &self,
        entity_id: EntityId,
    ) -> VibeResult<Option<ResourceAddress>> {
        Ok(self.entity(entity_id)?.participation_resource)
    }

    /// Whether `entity_id` is finalized
    pub fn is_finalized(&self, entity_id: EntityId) -> VibeResult<bool> {
        Ok(self.entity(entity_id)?.finalized)
    }

    /// Ids created for `creator`, in creation order
    pub fn entities_by_creator(&self, creator: Principal) -> &[EntityId] {
        self.by_creator
            .get(&creator)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every `(id, ticket resource)` pair, for off-chain indexing
    pub fn all_entities(&self) -> Vec<(EntityId, ResourceAddress)> {
        self.records
            .iter()
            .map(|record| (record.id, record.ticket_resource))
            .collect()
    }

    /// Number of entities created
    pub fn count(&self) -> u64 {
        self.records.len() as u64
    }

    /// Bound authorization manager
    pub fn manager(&self) -> Option<Principal> {
        self.manager
    }

    /// System owner
    pub fn system_owner(&self) -> Principal {
        self.system_owner
    }

    /// Ownership component
    pub fn ownership(&self) -> &OwnershipLedger {
        &self.ownership
    }

    /// Deterministic deployer
    pub fn deployer(&self) -> &dyn Deployer {
        self.deployer.as_ref()
    }

    /// Ledger configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Audit log shared by the registry and its authorization manager
    pub fn events(&self) -> &EventLog {
        &self.events
    }
}

impl OwnershipOracle for Registry {
    fn owner_of(&self, entity_id: EntityId) -> Option<Principal> {
        self.ownership.owner_of(entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use vibestream_core::NoopRegistrationService;

    fn registry() -> Registry {
        let mut registry = Registry::new(
            RegistryConfig::default(),
            Principal::derive("owner"),
            Box::new(NoopRegistrationService),
        );
        registry
            .initialize(Principal::derive("owner"), Principal::derive("manager"))
            .unwrap();
        registry
    }

    #[test]
    fn test_initialize_once() {
        let mut registry = registry();
        assert_matches!(
            registry.initialize(Principal::derive("owner"), Principal::derive("other")),
            Err(VibeError::AlreadyInitialized { .. })
        );
        assert_eq!(registry.manager(), Some(Principal::derive("manager")));
    }

    #[test]
    fn test_initialize_requires_system_owner() {
        let mut registry = Registry::new(
            RegistryConfig::default(),
            Principal::derive("owner"),
            Box::new(NoopRegistrationService),
        );
        assert_matches!(
            registry.initialize(Principal::derive("mallory"), Principal::derive("mallory")),
            Err(VibeError::Unauthorized { .. })
        );
        assert_eq!(registry.manager(), None);
    }

    #[test]
    fn test_mutation_before_initialization_is_unauthorized() {
        let alice = Principal::derive("alice");
        let mut registry = Registry::new(
            RegistryConfig::default(),
            Principal::derive("owner"),
            Box::new(NoopRegistrationService),
        );
        let id = registry.create(alice, CreateParams::new(0, "", "")).unwrap();
        assert_matches!(
            registry.finalize(id, alice),
            Err(VibeError::Unauthorized { .. })
        );
    }

    #[test]
    fn test_start_date_width_enforced() {
        let alice = Principal::derive("alice");
        let mut registry = Registry::new(
            RegistryConfig {
                start_date_bits: 8,
                ..RegistryConfig::default()
            },
            Principal::derive("owner"),
            Box::new(NoopRegistrationService),
        );
        assert!(registry.create(alice, CreateParams::new(255, "", "")).is_ok());
        assert_matches!(
            registry.create(alice, CreateParams::new(256, "", "")),
            Err(VibeError::InvalidInput { .. })
        );
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_create_for_rejects_zero_creator() {
        let mut registry = registry();
        assert_matches!(
            registry.create_for(
                Principal::derive("wrapper"),
                Principal::ZERO,
                CreateParams::new(0, "", "")
            ),
            Err(VibeError::InvalidInput { .. })
        );
    }

    #[test]
    fn test_metadata_mirrors_into_ownership() {
        let alice = Principal::derive("alice");
        let manager = Principal::derive("manager");
        let mut registry = registry();
        let id = registry
            .create(alice, CreateParams::new(0, "ipfs://a", "live"))
            .unwrap();
        registry.set_metadata_uri(id, manager, "ipfs://b").unwrap();

        assert_eq!(registry.entity(id).unwrap().metadata_uri, "ipfs://b");
        assert_eq!(registry.ownership().token_uri(id), Some("ipfs://b"));
        assert_eq!(registry.entity(id).unwrap().mode, "live");
    }

    #[test]
    fn test_append_event_is_manager_only() {
        let mut registry = registry();
        let event = VibestreamEvent::WhitelistUpdated {
            principal: Principal::derive("w"),
            whitelisted: true,
        };
        assert_matches!(
            registry.append_event(Principal::derive("mallory"), event.clone()),
            Err(VibeError::Unauthorized { .. })
        );
        assert_eq!(registry.events().len(), 1);

        let sequence = registry
            .append_event(Principal::derive("manager"), event)
            .unwrap();
        assert_eq!(sequence, 1);
        assert_eq!(registry.events().len(), 2);
    }

    #[test]
    fn test_unknown_entity() {
        let registry = registry();
        assert_matches!(
            registry.entity(EntityId::new(0)),
            Err(VibeError::NotFound { .. })
        );
        assert!(registry.entities_by_creator(Principal::derive("nobody")).is_empty());
    }

    #[test]
    fn test_transfer_keeps_creator() {
        let alice = Principal::derive("alice");
        let bob = Principal::derive("bob");
        let mut registry = registry();
        let id = registry.create(alice, CreateParams::new(0, "", "")).unwrap();
        registry.transfer_ownership(id, alice, bob).unwrap();

        assert_eq!(registry.owner_of(id), Some(bob));
        assert_eq!(registry.entity(id).unwrap().creator, alice);
        assert_matches!(
            registry.deploy_participation_resource(id, bob),
            Err(VibeError::NotPrimaryOwner { .. })
        );
        assert!(registry.deploy_participation_resource(id, alice).is_ok());
    }
}
