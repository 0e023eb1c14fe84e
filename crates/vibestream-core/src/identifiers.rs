//! Core identifier types used across the Vibestream registry
//!
//! Principals act on entities; resource addresses name deployed
//! sub-resources. Both are 20-byte values where the all-zero value means
//! "empty" and is never a valid participant.

use crate::errors::VibeError;
use crate::hash;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length in bytes of principals and resource addresses
pub const ADDRESS_LEN: usize = 20;

fn parse_address_bytes(s: &str) -> Result<[u8; ADDRESS_LEN], VibeError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let decoded = hex::decode(digits)
        .map_err(|e| VibeError::invalid_input(format!("invalid hex address '{s}': {e}")))?;
    <[u8; ADDRESS_LEN]>::try_from(decoded.as_slice()).map_err(|_| {
        VibeError::invalid_input(format!(
            "address '{s}' must be {ADDRESS_LEN} bytes, got {}",
            decoded.len()
        ))
    })
}

fn truncate_digest(digest: [u8; 32]) -> [u8; ADDRESS_LEN] {
    let mut bytes = [0u8; ADDRESS_LEN];
    bytes.copy_from_slice(&digest[32 - ADDRESS_LEN..]);
    bytes
}

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(pub [u8; ADDRESS_LEN]);

        impl $name {
            /// The empty value
            pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

            /// Create from raw bytes
            pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
                Self(bytes)
            }

            /// Take the trailing bytes of a 32-byte digest
            pub fn from_digest(digest: [u8; 32]) -> Self {
                Self(truncate_digest(digest))
            }

            /// Get the raw bytes
            pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
                &self.0
            }

            /// Whether this is the empty value
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; ADDRESS_LEN]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = VibeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_address_bytes(s).map(Self)
            }
        }

        impl TryFrom<String> for $name {
            type Error = VibeError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.to_string()
            }
        }
    };
}

address_type!(
    /// An actor that can own entities, hold delegated authority, or
    /// administer the system
    Principal
);

address_type!(
    /// Identity of a deployed sub-resource or delegation capability
    ResourceAddress
);

impl Principal {
    /// Derive a stable principal from a human-readable label
    ///
    /// Used for system identities such as the authorization manager, and
    /// for fixtures.
    pub fn derive(label: &str) -> Self {
        let mut h = hash::hasher();
        h.update(b"vibestream.principal");
        h.update(label.as_bytes());
        Self::from_digest(h.finalize())
    }
}

/// Sequential entity identifier
///
/// Assigned starting at zero, never reused and never decreasing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create an entity id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner value
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The id assigned after this one
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Big-endian encoding used in salts
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vibe-{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Kind of per-entity resource instantiated through the deployer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceLabel {
    /// Admission/ticketing resource, deployed at creation
    Ticket,
    /// Monetized participation resource, opt-in and creator-only
    Participation,
    /// Delegation capability granting one delegate authority over one entity
    Delegation,
}

impl ResourceLabel {
    /// Label mixed into the deployment salt
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceLabel::Ticket => "ticket",
            ResourceLabel::Participation => "participation",
            ResourceLabel::Delegation => "delegation",
        }
    }
}

impl fmt::Display for ResourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_hex_roundtrip() {
        let principal = Principal::derive("alice");
        let parsed: Principal = principal.to_string().parse().unwrap();
        assert_eq!(principal, parsed);
        assert!(principal.to_string().starts_with("0x"));
        assert_eq!(principal.to_string().len(), 2 + ADDRESS_LEN * 2);
    }

    #[test]
    fn test_parse_without_prefix() {
        let raw = "11".repeat(ADDRESS_LEN);
        let address: ResourceAddress = raw.parse().unwrap();
        assert_eq!(address.as_bytes(), &[0x11; ADDRESS_LEN]);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let err = "0xabcd".parse::<Principal>().unwrap_err();
        assert!(matches!(err, VibeError::InvalidInput { .. }));
        assert!("0xzz".parse::<Principal>().is_err());
    }

    #[test]
    fn test_derive_is_stable_and_nonzero() {
        assert_eq!(Principal::derive("manager"), Principal::derive("manager"));
        assert_ne!(Principal::derive("manager"), Principal::derive("owner"));
        assert!(!Principal::derive("manager").is_zero());
        assert!(Principal::ZERO.is_zero());
    }

    #[test]
    fn test_entity_id_sequence() {
        let id = EntityId::default();
        assert_eq!(id.value(), 0);
        assert_eq!(id.next().next(), EntityId::new(2));
        assert_eq!(EntityId::new(7).to_string(), "vibe-7");
    }
}
