//! # Vibestream Registry
//!
//! The canonical ledger of vibestream entities. Each entity is created
//! together with its ticket resource, may later gain a participation
//! resource, and ends in an irreversible finalized state.
//!
//! - `registry` - the [`Registry`] ledger and its shared handle
//! - `deployer` - deterministic, recomputable sub-resource addressing
//! - `ownership` - the token-ownership component the registry mints into
//! - `record` - entity records and creation parameters

#![forbid(unsafe_code)]

pub mod deployer;
pub mod ownership;
pub mod record;
pub mod registry;

pub use deployer::{deployment_salt, encode_constructor_args, Create2Deployer, Deployer};
pub use ownership::OwnershipLedger;
pub use record::{CreateParams, EntityRecord, TicketParams};
pub use registry::{Registry, SharedRegistry};
