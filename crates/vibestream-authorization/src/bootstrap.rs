//! One-shot system assembly.

use crate::manager::AuthorizationManager;
use std::sync::Arc;
use tracing::info;
use vibestream_core::{
    ParticipationHost, Principal, RegistrationService, VibeResult, VibestreamConfig,
};
use vibestream_registry::{Create2Deployer, Deployer, Registry};

/// Principal the authorization manager acts as under `deployer_domain`
pub fn manager_identity(deployer_domain: &str) -> Principal {
    Principal::derive(&format!("{deployer_domain}/authorization-manager"))
}

/// Build a registry and its authorization manager and bind them together
///
/// Validates `config`, shares one deterministic deployer between the
/// registry and the delegation store, and initializes the registry with the
/// manager's identity.
pub fn bootstrap(
    config: &VibestreamConfig,
    system_owner: Principal,
    registration: Box<dyn RegistrationService>,
    participation: Box<dyn ParticipationHost>,
) -> VibeResult<AuthorizationManager> {
    config.validate()?;

    let domain = config.registry.deployer_domain.clone();
    let deployer: Arc<dyn Deployer> = Arc::new(Create2Deployer::new(domain.clone()));
    let identity = manager_identity(&domain);

    let mut registry = Registry::new(config.registry.clone(), system_owner, registration)
        .with_deployer(Arc::clone(&deployer));
    registry.initialize(system_owner, identity)?;

    let manager = AuthorizationManager::new(
        identity,
        system_owner,
        registry.into_shared(),
        deployer,
        participation,
    )
    .with_creation_wrapper(config.authorization.creation_wrapper);

    info!(
        manager = %identity,
        system_owner = %system_owner,
        domain = %domain,
        "Vibestream registry bootstrapped"
    );
    Ok(manager)
}
