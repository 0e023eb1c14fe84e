//! # Vibestream Core
//!
//! Shared vocabulary for the Vibestream registry and its authorization
//! manager:
//!
//! - `identifiers` - entity ids, principals, resource addresses and labels
//! - `errors` - the unified [`VibeError`] taxonomy
//! - `hash` - the single hashing primitive behind every derived identity
//! - `events` - the append-only audit log
//! - `config` - layered TOML/environment configuration
//! - `effects` - interfaces to external collaborators (ownership oracle,
//!   downstream registration service, participation host)

#![forbid(unsafe_code)]

pub mod config;
pub mod effects;
pub mod errors;
pub mod events;
pub mod hash;
pub mod identifiers;

pub use config::{AuthorizationConfig, RegistryConfig, VibestreamConfig};
pub use effects::{
    InMemoryParticipationHost, InMemoryRegistrationService, NoopRegistrationService,
    OwnershipOracle, ParticipationHost, RegistrationNotice, RegistrationService,
};
pub use errors::{VibeError, VibeResult};
pub use events::{EventLog, EventRecord, VibestreamEvent};
pub use identifiers::{EntityId, Principal, ResourceAddress, ResourceLabel, ADDRESS_LEN};
