//! Unified error system for the Vibestream registry
//!
//! A single error type shared by the registry, the delegation store and the
//! authorization manager. Every variant is a distinct failure kind so callers
//! can branch on what went wrong instead of parsing strings.

use crate::identifiers::{EntityId, Principal, ResourceLabel};
use serde::{Deserialize, Serialize};

/// Unified error type for all Vibestream operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum VibeError {
    /// Malformed or out-of-range input (start date width, empty principal)
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of the rejected input
        message: String,
    },

    /// The deterministic deployer produced an empty identity
    #[error("Deployment of {label} resource for {entity_id} failed")]
    DeploymentFailed {
        /// Entity the resource was being deployed for
        entity_id: EntityId,
        /// Which sub-resource failed
        label: ResourceLabel,
    },

    /// Caller holds none of the authorities the operation requires
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of the missing authority
        message: String,
    },

    /// The entity has reached its terminal state
    #[error("{entity_id} is already finalized")]
    AlreadyFinalized {
        /// The finalized entity
        entity_id: EntityId,
    },

    /// A one-shot sub-resource already exists for this entity
    #[error("{label} resource already deployed for {entity_id}")]
    AlreadyDeployed {
        /// Entity owning the resource
        entity_id: EntityId,
        /// Which sub-resource already exists
        label: ResourceLabel,
    },

    /// One-time bootstrap invoked twice
    #[error("Already initialized: {message}")]
    AlreadyInitialized {
        /// What was already initialized
        message: String,
    },

    /// Operation restricted to the entity's owner or creator
    #[error("{caller} is not the primary owner of {entity_id}")]
    NotPrimaryOwner {
        /// Entity the operation targeted
        entity_id: EntityId,
        /// Principal that attempted the operation
        caller: Principal,
    },

    /// Entity or sub-resource does not exist
    #[error("Not found: {message}")]
    NotFound {
        /// Description of what was not found
        message: String,
    },

    /// Downstream registration service rejected a notification
    #[error("Registration error: {message}")]
    Registration {
        /// Error reported by the registration service
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },
}

impl VibeError {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create an already-initialized error
    pub fn already_initialized(message: impl Into<String>) -> Self {
        Self::AlreadyInitialized {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an error for an unknown entity id
    pub fn unknown_entity(entity_id: EntityId) -> Self {
        Self::not_found(format!("{entity_id} does not exist"))
    }

    /// Create a registration service error
    pub fn registration(message: impl Into<String>) -> Self {
        Self::Registration {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Standard Result type for Vibestream operations
pub type VibeResult<T> = std::result::Result<T, VibeError>;

impl From<toml::de::Error> for VibeError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = VibeError::invalid_input("start date exceeds 96 bits");
        assert!(matches!(err, VibeError::InvalidInput { .. }));
        assert_eq!(err.to_string(), "Invalid input: start date exceeds 96 bits");
    }

    #[test]
    fn test_structured_display() {
        let err = VibeError::AlreadyDeployed {
            entity_id: EntityId::new(3),
            label: ResourceLabel::Participation,
        };
        assert_eq!(
            err.to_string(),
            "participation resource already deployed for vibe-3"
        );
    }

    #[test]
    fn test_toml_error_conversion() {
        let parse_err = toml::from_str::<toml::Value>("[registry").unwrap_err();
        assert!(matches!(VibeError::from(parse_err), VibeError::Config { .. }));
    }
}
