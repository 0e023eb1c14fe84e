//! # Vibestream Authorization
//!
//! Decides who may mutate an entity's record and forwards permitted
//! mutations to the registry. Authority is delegated without moving
//! ownership: an owner may name a single revocable delegate through a
//! one-time delegation capability, and the system owner may whitelist
//! operators with authority over every entity.
//!
//! ```
//! use vibestream_authorization::bootstrap;
//! use vibestream_core::{
//!     InMemoryParticipationHost, NoopRegistrationService, Principal, VibestreamConfig,
//! };
//! use vibestream_registry::CreateParams;
//!
//! let owner = Principal::derive("system-owner");
//! let alice = Principal::derive("alice");
//! let bob = Principal::derive("bob");
//!
//! let mut manager = bootstrap(
//!     &VibestreamConfig::default(),
//!     owner,
//!     Box::new(NoopRegistrationService),
//!     Box::new(InMemoryParticipationHost::new()),
//! )?;
//! let id = manager
//!     .registry()
//!     .lock()
//!     .create(alice, CreateParams::new(0, "ipfs://a", "live"))?;
//!
//! manager.create_delegation_capability(alice, id, bob)?;
//! manager.update_metadata(bob, id, "ipfs://b")?;
//! # Ok::<(), vibestream_core::VibeError>(())
//! ```

#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod delegation;
pub mod manager;
pub mod whitelist;

pub use bootstrap::{bootstrap, manager_identity};
pub use delegation::{CapabilityOrigin, DelegationCapability, DelegationStore};
pub use manager::{Authority, AuthorizationManager};
pub use whitelist::Whitelist;
