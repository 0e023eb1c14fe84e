//! Interfaces to external collaborators
//!
//! The registry and the authorization manager never reach outside the
//! process directly. Ownership lookups, downstream indexing and
//! participation-resource control all go through these traits so they can be
//! replaced by in-memory implementations in tests.

pub mod ownership;
pub mod participation;
pub mod registration;

pub use ownership::OwnershipOracle;
pub use participation::{InMemoryParticipationHost, ParticipationHost};
pub use registration::{
    InMemoryRegistrationService, NoopRegistrationService, RegistrationNotice,
    RegistrationService,
};
