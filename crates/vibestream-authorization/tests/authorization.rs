//! Permission resolution, delegation capabilities and administration.

#![allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]

use assert_matches::assert_matches;
use proptest::prelude::*;
use vibestream_authorization::{bootstrap, Authority, AuthorizationManager};
use vibestream_core::{
    EntityId, InMemoryParticipationHost, NoopRegistrationService, Principal, ResourceLabel,
    VibeError, VibestreamConfig, VibestreamEvent,
};
use vibestream_registry::CreateParams;

fn system_owner() -> Principal {
    Principal::derive("system-owner")
}

fn manager_with(config: &VibestreamConfig) -> AuthorizationManager {
    bootstrap(
        config,
        system_owner(),
        Box::new(NoopRegistrationService),
        Box::new(InMemoryParticipationHost::new()),
    )
    .expect("bootstrap")
}

fn manager() -> AuthorizationManager {
    manager_with(&VibestreamConfig::default())
}

fn create(manager: &AuthorizationManager, creator: Principal) -> EntityId {
    manager
        .registry()
        .lock()
        .create(creator, CreateParams::new(0, "ipfs://genesis", "live"))
        .expect("create")
}

fn principal(seed: u8) -> Principal {
    Principal::derive(&format!("principal-{seed}"))
}

proptest! {
    /// Owner O = 0, delegate D = 1, whitelisted W = 2; everyone else is denied.
    #[test]
    fn metadata_truth_table(caller_seed in 0u8..8) {
        let mut manager = manager();
        let (o, d, w) = (principal(0), principal(1), principal(2));
        let id = create(&manager, o);
        manager.create_delegation_capability(o, id, d).unwrap();
        manager.set_whitelist(system_owner(), w, true).unwrap();

        let caller = principal(caller_seed);
        let result = manager.update_metadata(caller, id, "ipfs://attempt");
        let uri = manager.registry().lock().entity(id).unwrap().metadata_uri.clone();

        if [o, d, w].contains(&caller) {
            prop_assert!(result.is_ok());
            prop_assert_eq!(uri, "ipfs://attempt");
        } else {
            prop_assert!(matches!(result, Err(VibeError::Unauthorized { .. })), "expected Unauthorized, got {:?}", result);
            prop_assert_eq!(uri, "ipfs://genesis");
        }
    }

    #[test]
    fn capability_created_at_most_once(callers in prop::collection::vec(0u8..4, 1..12)) {
        let mut manager = manager();
        let id = create(&manager, principal(0));

        let successes = callers
            .iter()
            .filter(|seed| {
                manager
                    .create_delegation_capability(principal(**seed), id, principal(9))
                    .is_ok()
            })
            .count();

        prop_assert!(successes <= 1);
        prop_assert_eq!(successes == 1, callers.contains(&0));
    }
}

#[test]
fn resolution_reports_the_matching_tier() {
    let mut manager = manager();
    let (o, d, w) = (principal(0), principal(1), principal(2));
    let id = create(&manager, o);
    manager.update_delegate(o, id, d).unwrap();
    manager.set_whitelist(system_owner(), w, true).unwrap();

    assert_eq!(manager.resolve_authority(o, id).unwrap(), Some(Authority::Owner));
    assert_eq!(manager.resolve_authority(d, id).unwrap(), Some(Authority::Delegate));
    assert_eq!(
        manager.resolve_authority(w, id).unwrap(),
        Some(Authority::Whitelisted)
    );
    assert_eq!(manager.resolve_authority(principal(5), id).unwrap(), None);
}

#[test]
fn same_resolution_guards_finalization() {
    let mut manager = manager();
    let id = create(&manager, principal(0));

    assert_matches!(
        manager.finalize(principal(3), id),
        Err(VibeError::Unauthorized { .. })
    );
    assert!(!manager.registry().lock().is_finalized(id).unwrap());

    manager.update_delegate(principal(0), id, principal(3)).unwrap();
    manager.finalize(principal(3), id).unwrap();
    assert!(manager.registry().lock().is_finalized(id).unwrap());
}

#[test]
fn second_capability_fails_even_for_owner() {
    let mut manager = manager();
    let o = principal(0);
    let id = create(&manager, o);

    let capability = manager.create_delegation_capability(o, id, principal(1)).unwrap();
    assert_matches!(
        manager.create_delegation_capability(o, id, principal(2)),
        Err(VibeError::AlreadyDeployed {
            label: ResourceLabel::Delegation,
            ..
        })
    );
    assert_eq!(manager.delegate_of(id), Some(principal(1)));
    assert_eq!(manager.capability(id), Some(&capability));
}

#[test]
fn delegate_update_keeps_capability_identity() {
    let mut manager = manager();
    let o = principal(0);
    let id = create(&manager, o);

    let capability = manager.create_delegation_capability(o, id, principal(1)).unwrap();
    assert_eq!(
        capability.proxy_identity,
        manager.capability_identity(id).unwrap()
    );

    manager.update_delegate(o, id, principal(2)).unwrap();
    assert_eq!(manager.delegate_of(id), Some(principal(2)));
    assert_eq!(manager.capability(id).unwrap().delegate, principal(2));
    assert_eq!(
        manager.capability(id).unwrap().proxy_identity,
        capability.proxy_identity
    );

    assert_matches!(
        manager.update_metadata(principal(1), id, "ipfs://revoked"),
        Err(VibeError::Unauthorized { .. })
    );
    manager.update_metadata(principal(2), id, "ipfs://current").unwrap();
}

#[test]
fn delegate_update_is_owner_only() {
    let mut manager = manager();
    let id = create(&manager, principal(0));
    manager.update_delegate(principal(0), id, principal(1)).unwrap();

    assert_matches!(
        manager.update_delegate(principal(1), id, principal(1)),
        Err(VibeError::NotPrimaryOwner { .. })
    );
    assert_matches!(
        manager.update_delegate(principal(0), id, Principal::ZERO),
        Err(VibeError::InvalidInput { .. })
    );
    assert_eq!(manager.delegate_of(id), Some(principal(1)));
}

#[test]
fn capabilities_are_scoped_to_one_entity() {
    let mut manager = manager();
    let o = principal(0);
    let first = create(&manager, o);
    let second = create(&manager, o);
    manager.create_delegation_capability(o, first, principal(1)).unwrap();

    manager.update_metadata(principal(1), first, "ipfs://ok").unwrap();
    assert_matches!(
        manager.update_metadata(principal(1), second, "ipfs://no"),
        Err(VibeError::Unauthorized { .. })
    );
    assert_ne!(
        manager.capability_identity(first).unwrap(),
        manager.capability_identity(second).unwrap()
    );
}

#[test]
fn wrapper_creates_capability_for_creator() {
    let wrapper = Principal::derive("wrapper");
    let mut config = VibestreamConfig::default();
    config.authorization.creation_wrapper = Some(wrapper);
    let mut manager = manager_with(&config);
    let creator = principal(0);

    let id = manager
        .registry()
        .lock()
        .create_for(wrapper, creator, CreateParams::new(0, "", "live"))
        .unwrap();

    assert_matches!(
        manager.create_delegation_capability_for(wrapper, id, principal(7), principal(1)),
        Err(VibeError::NotPrimaryOwner { .. })
    );
    assert_matches!(
        manager.create_delegation_capability_for(principal(7), id, creator, principal(1)),
        Err(VibeError::Unauthorized { .. })
    );

    let capability = manager
        .create_delegation_capability_for(wrapper, id, creator, principal(1))
        .unwrap();
    assert_eq!(capability.created_by, wrapper);
    assert_eq!(manager.delegate_of(id), Some(principal(1)));
}

#[test]
fn clearing_wrapper_revokes_its_path() {
    let wrapper = Principal::derive("wrapper");
    let mut manager = manager();
    let id = create(&manager, principal(0));

    manager.set_creation_wrapper(system_owner(), wrapper).unwrap();
    assert_eq!(manager.creation_wrapper(), Some(wrapper));
    manager
        .set_creation_wrapper(system_owner(), Principal::ZERO)
        .unwrap();
    assert_eq!(manager.creation_wrapper(), None);

    assert_matches!(
        manager.create_delegation_capability_for(wrapper, id, principal(0), principal(1)),
        Err(VibeError::Unauthorized { .. })
    );
    assert_matches!(
        manager.events().last(),
        Some(VibestreamEvent::CreationWrapperUpdated { wrapper: None })
    );
}

#[test]
fn administration_is_system_owner_only() {
    let mut manager = manager();
    let intruder = principal(4);
    let events_before = manager.events().len();

    assert_matches!(
        manager.set_whitelist(intruder, intruder, true),
        Err(VibeError::Unauthorized { .. })
    );
    assert_matches!(
        manager.batch_set_whitelist(intruder, &[intruder], true),
        Err(VibeError::Unauthorized { .. })
    );
    assert_matches!(
        manager.set_creation_wrapper(intruder, intruder),
        Err(VibeError::Unauthorized { .. })
    );
    assert!(!manager.is_whitelisted(intruder));
    assert_eq!(manager.events().len(), events_before);
}

#[test]
fn whitelist_toggles_and_batches() {
    let mut manager = manager();

    assert_matches!(
        manager.set_whitelist(system_owner(), Principal::ZERO, true),
        Err(VibeError::InvalidInput { .. })
    );

    let applied = manager
        .batch_set_whitelist(
            system_owner(),
            &[principal(1), Principal::ZERO, principal(2)],
            true,
        )
        .unwrap();
    assert_eq!(applied, 2);
    assert!(manager.is_whitelisted(principal(1)));
    assert!(manager.is_whitelisted(principal(2)));
    let updates = manager
        .events()
        .records()
        .iter()
        .filter(|record| matches!(record.event, VibestreamEvent::WhitelistUpdated { .. }))
        .count();
    assert_eq!(updates, 2);

    manager.set_whitelist(system_owner(), principal(1), false).unwrap();
    assert!(!manager.is_whitelisted(principal(1)));
    assert_eq!(manager.whitelist().len(), 1);
}

#[test]
fn resolution_against_a_held_registry_lock() {
    let manager = manager();
    let id = create(&manager, principal(0));

    let registry = manager.registry().lock();
    assert_eq!(
        manager
            .resolve_authority_in(&registry, principal(0), id)
            .unwrap(),
        Some(Authority::Owner)
    );
    assert_eq!(
        manager
            .resolve_authority_in(&registry, principal(6), id)
            .unwrap(),
        None
    );
}
