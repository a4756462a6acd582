//! Configuration types for the orgauth engine.

use orgauth_core::error::{Error, Result};
use orgauth_core::hierarchy::EntityKind;
use orgauth_core::types::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthzConfig {
    /// Emit audit events for moves.
    pub audit_enabled: bool,
    /// Permission cache settings.
    pub cache: CacheConfig,
    /// Retry settings for transient move conflicts.
    pub retry: RetryConfig,
    /// Role definitions to seed the role store with.
    pub roles: Vec<Role>,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            audit_enabled: true,
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            roles: Vec::new(),
        }
    }
}

/// Permission cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable permission caching.
    pub enabled: bool,
    /// Cache TTL in seconds.
    pub ttl_seconds: u64,
    /// Maximum cache entries.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 300, // 5 minutes
            max_entries: 10000,
        }
    }
}

/// Retry policy for transient concurrency conflicts during moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base backoff between attempts in milliseconds; doubles per retry.
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 50,
        }
    }
}

impl AuthzConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("failed to read config file: {}", e)))?;
        let config: AuthzConfig = serde_json::from_str(&content)
            .map_err(|e| Error::configuration(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn to_file(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| Error::configuration(format!("failed to write config file: {}", e)))?;
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        let max_level = (EntityKind::ALL.len() - 1) as u8;

        for role in &self.roles {
            if !names.insert(&role.name) {
                return Err(Error::configuration(format!(
                    "duplicate role name: {}",
                    role.name
                )));
            }
            if role.hierarchy_level > max_level {
                return Err(Error::configuration(format!(
                    "role {} has hierarchy level {} above the leaf level {}",
                    role.name, role.hierarchy_level, max_level
                )));
            }
            for &level in &role.can_manage {
                if level > max_level {
                    return Err(Error::configuration(format!(
                        "role {} manages unknown level {}",
                        role.name, level
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn config_with_roles() -> AuthzConfig {
        AuthzConfig {
            roles: vec![
                Role::new("union_admin", 0, &["conferences.*:subordinate"])
                    .unwrap()
                    .with_can_manage(&[1, 2, 3, 4]),
                Role::new("team_leader", 3, &["services.view:subordinate"]).unwrap(),
            ],
            ..AuthzConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = AuthzConfig::default();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl_seconds, 300);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_file_round_trip() {
        let config = config_with_roles();
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        config.to_file(path).unwrap();
        let loaded = AuthzConfig::from_file(path).unwrap();
        assert_eq!(loaded.roles.len(), config.roles.len());
        assert_eq!(loaded.cache.ttl_seconds, config.cache.ttl_seconds);
    }

    #[test]
    fn test_validation_rejects_duplicates() {
        let mut config = config_with_roles();
        config
            .roles
            .push(Role::new("union_admin", 0, &["unions.view"]).unwrap());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_levels() {
        let mut config = AuthzConfig::default();
        config
            .roles
            .push(Role::new("off_table", 7, &["unions.view"]).unwrap());
        assert!(config.validate().is_err());

        let mut config = AuthzConfig::default();
        config.roles.push(
            Role::new("bad_manage", 0, &["unions.view"])
                .unwrap()
                .with_can_manage(&[9]),
        );
        assert!(config.validate().is_err());
    }
}
