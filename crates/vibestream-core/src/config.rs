//! Configuration for the registry and the authorization manager
//!
//! Configuration is layered: defaults, then an optional TOML file, then
//! `VIBESTREAM_*` environment variables. [`VibestreamConfig::validate`] runs
//! after the last layer is applied.

use crate::errors::{VibeError, VibeResult};
use crate::identifiers::Principal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Default declared width of an entity start date
pub const DEFAULT_START_DATE_BITS: u32 = 96;

/// Default domain separator mixed into deterministic addresses
pub const DEFAULT_DEPLOYER_DOMAIN: &str = "vibestream.deployer.v1";

const ENV_START_DATE_BITS: &str = "VIBESTREAM_START_DATE_BITS";
const ENV_DEPLOYER_DOMAIN: &str = "VIBESTREAM_DEPLOYER_DOMAIN";
const ENV_CREATION_WRAPPER: &str = "VIBESTREAM_CREATION_WRAPPER";

/// Registry ledger settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Width in bits a start date must fit in
    pub start_date_bits: u32,
    /// Domain separator for the deterministic deployer
    pub deployer_domain: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            start_date_bits: DEFAULT_START_DATE_BITS,
            deployer_domain: DEFAULT_DEPLOYER_DOMAIN.to_string(),
        }
    }
}

impl RegistryConfig {
    /// Largest start date accepted under the declared width
    pub fn max_start_date(&self) -> u128 {
        if self.start_date_bits >= 128 {
            u128::MAX
        } else {
            (1u128 << self.start_date_bits) - 1
        }
    }
}

/// Authorization manager settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorizationConfig {
    /// Trusted creation-wrapper service allowed to create delegation
    /// capabilities on behalf of creators
    pub creation_wrapper: Option<Principal>,
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VibestreamConfig {
    /// Registry settings
    pub registry: RegistryConfig,
    /// Authorization settings
    pub authorization: AuthorizationConfig,
}

impl VibestreamConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> VibeResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> VibeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VibeError::config(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded Vibestream configuration");
        Ok(config)
    }

    /// Apply overrides from `VIBESTREAM_*` environment variables
    pub fn merge_with_env(&mut self) -> VibeResult<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply overrides from an explicit set of variables
    pub fn merge_with_vars<I>(&mut self, vars: I) -> VibeResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                ENV_START_DATE_BITS => {
                    self.registry.start_date_bits = value.trim().parse().map_err(|e| {
                        VibeError::config(format!("{ENV_START_DATE_BITS}='{value}': {e}"))
                    })?;
                }
                ENV_DEPLOYER_DOMAIN => {
                    self.registry.deployer_domain = value;
                }
                ENV_CREATION_WRAPPER => {
                    self.authorization.creation_wrapper = if value.trim().is_empty() {
                        None
                    } else {
                        let wrapper = value.trim().parse::<Principal>().map_err(|e| {
                            VibeError::config(format!("{ENV_CREATION_WRAPPER}: {e}"))
                        })?;
                        Some(wrapper)
                    };
                }
                _ => continue,
            }
            debug!(key = %key, "Applied environment override");
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> VibeResult<()> {
        let bits = self.registry.start_date_bits;
        if !(1..=128).contains(&bits) {
            return Err(VibeError::config(format!(
                "registry.start_date_bits must be between 1 and 128 (got {bits})"
            )));
        }
        if self.registry.deployer_domain.trim().is_empty() {
            return Err(VibeError::config("registry.deployer_domain must not be empty"));
        }
        if self
            .authorization
            .creation_wrapper
            .is_some_and(|wrapper| wrapper.is_zero())
        {
            return Err(VibeError::config(
                "authorization.creation_wrapper must not be the zero principal",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = VibestreamConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.registry.max_start_date(), (1u128 << 96) - 1);
    }

    #[test]
    fn test_full_width_start_date() {
        let config = RegistryConfig {
            start_date_bits: 128,
            ..RegistryConfig::default()
        };
        assert_eq!(config.max_start_date(), u128::MAX);
    }

    #[test]
    fn test_env_overrides() {
        let wrapper = Principal::derive("wrapper");
        let mut config = VibestreamConfig::default();
        config
            .merge_with_vars([
                (ENV_START_DATE_BITS.to_string(), "40".to_string()),
                (ENV_CREATION_WRAPPER.to_string(), wrapper.to_string()),
                ("UNRELATED".to_string(), "x".to_string()),
            ])
            .unwrap();
        assert_eq!(config.registry.start_date_bits, 40);
        assert_eq!(config.authorization.creation_wrapper, Some(wrapper));
    }

    #[test]
    fn test_env_rejects_bad_width() {
        let mut config = VibestreamConfig::default();
        let err = config
            .merge_with_vars([(ENV_START_DATE_BITS.to_string(), "wide".to_string())])
            .unwrap_err();
        assert!(matches!(err, VibeError::Config { .. }));
    }

    #[test]
    fn test_validation_rejects_zero_width() {
        let mut config = VibestreamConfig::default();
        config.registry.start_date_bits = 0;
        assert!(config.validate().is_err());
        config.registry.start_date_bits = 129;
        assert!(config.validate().is_err());
    }
}
