//! Deterministic sub-resource deployment
//!
//! A resource's address is a pure function of the deployer's identity, the
//! entity id, the resource label and the constructor arguments, so any
//! observer can recompute it without watching the deployment itself:
//!
//! ```text
//! salt    = H(entity_id_be || label)
//! address = H(domain || 0xff || deployer_identity || salt || H(args))[12..32]
//! ```
//!
//! The deployer keeps no state between calls. One-shot enforcement per
//! `(entity_id, label)` belongs to whoever records the deployment.

use serde::Serialize;
use vibestream_core::hash::{hash, hasher};
use vibestream_core::{EntityId, ResourceAddress, ResourceLabel, VibeError, VibeResult};

/// Deterministic instantiation of per-entity resources
pub trait Deployer: Send + Sync {
    /// The deployer's own identity, mixed into every address
    fn identity(&self) -> ResourceAddress;

    /// Compute the address a deployment would land at, without deploying
    fn compute_address(
        &self,
        entity_id: EntityId,
        label: ResourceLabel,
        constructor_args: &[u8],
    ) -> ResourceAddress;

    /// Instantiate the resource and return its address
    ///
    /// Returns [`ResourceAddress::ZERO`] when instantiation fails.
    fn deploy(
        &self,
        entity_id: EntityId,
        label: ResourceLabel,
        constructor_args: &[u8],
    ) -> ResourceAddress {
        self.compute_address(entity_id, label, constructor_args)
    }
}

/// Salt for a `(entity_id, label)` pair
pub fn deployment_salt(entity_id: EntityId, label: ResourceLabel) -> [u8; 32] {
    let mut h = hasher();
    h.update(&entity_id.to_be_bytes());
    h.update(label.as_str().as_bytes());
    h.finalize()
}

/// Canonical constructor-argument encoding
pub fn encode_constructor_args<T: Serialize + ?Sized>(args: &T) -> VibeResult<Vec<u8>> {
    bincode::serialize(args)
        .map_err(|e| VibeError::invalid_input(format!("unencodable constructor arguments: {e}")))
}

/// Salted-hash deployer in the style of `CREATE2`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Create2Deployer {
    domain: String,
    identity: ResourceAddress,
}

impl Create2Deployer {
    /// Create a deployer whose identity is derived from `domain`
    pub fn new(domain: impl Into<String>) -> Self {
        let domain = domain.into();
        let mut h = hasher();
        h.update(domain.as_bytes());
        h.update(b"deployer");
        let identity = ResourceAddress::from_digest(h.finalize());
        Self { domain, identity }
    }

    /// Override the deployer identity
    pub fn with_identity(mut self, identity: ResourceAddress) -> Self {
        self.identity = identity;
        self
    }

    /// Domain separator in use
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl Deployer for Create2Deployer {
    fn identity(&self) -> ResourceAddress {
        self.identity
    }

    fn compute_address(
        &self,
        entity_id: EntityId,
        label: ResourceLabel,
        constructor_args: &[u8],
    ) -> ResourceAddress {
        let mut h = hasher();
        h.update(self.domain.as_bytes());
        h.update(&[0xff]);
        h.update(self.identity.as_bytes());
        h.update(&deployment_salt(entity_id, label));
        h.update(&hash(constructor_args));
        ResourceAddress::from_digest(h.finalize())
    }
}
