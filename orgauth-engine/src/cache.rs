//! Permission-set cache.
//!
//! Memoizes resolver output per principal with explicit invalidation.
//! Entries are lazily populated on first access and expire after the
//! configured TTL. Resolution is deterministic and idempotent, so a
//! cache-miss race is resolved last-writer-wins without extra locking.
//! No negative caching: a failed resolution stores nothing.

use crate::config::CacheConfig;
use crate::resolver::RoleResolver;
use orgauth_core::error::Result;
use orgauth_core::permission::PermissionSet;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

struct CacheEntry {
    permissions: PermissionSet,
    computed_at: Instant,
}

/// TTL cache of resolved permission sets, keyed by principal id.
///
/// Explicitly constructed and injected into the engine; there is no
/// global instance.
pub struct PermissionCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    enabled: bool,
    max_entries: usize,
}

impl PermissionCache {
    /// Create a cache from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(config.ttl_seconds),
            enabled: config.enabled,
            max_entries: config.max_entries,
        }
    }

    /// Cached permission set for a principal, if present and fresh.
    pub async fn get(&self, principal_id: &str) -> Option<PermissionSet> {
        if !self.enabled {
            return None;
        }
        let entries = self.entries.read().await;
        entries
            .get(principal_id)
            .filter(|e| e.computed_at.elapsed() < self.ttl)
            .map(|e| e.permissions.clone())
    }

    /// Return the cached set or recompute it through the resolver and
    /// store the result.
    pub async fn get_or_resolve(
        &self,
        principal_id: &str,
        resolver: &RoleResolver,
    ) -> Result<PermissionSet> {
        if let Some(cached) = self.get(principal_id).await {
            return Ok(cached);
        }

        let permissions = resolver.resolve_id(principal_id).await?;

        if self.enabled {
            let mut entries = self.entries.write().await;
            if entries.len() < self.max_entries || entries.contains_key(principal_id) {
                entries.insert(
                    principal_id.to_string(),
                    CacheEntry {
                        permissions: permissions.clone(),
                        computed_at: Instant::now(),
                    },
                );
            } else {
                debug!(
                    principal = %principal_id,
                    max_entries = self.max_entries,
                    "permission cache full, skipping insert"
                );
            }
        }
        Ok(permissions)
    }

    /// Drop one principal's entry. Called when assignments change or an
    /// entity within the principal's scope is reparented.
    pub async fn invalidate(&self, principal_id: &str) {
        let removed = self.entries.write().await.remove(principal_id).is_some();
        if removed {
            debug!(principal = %principal_id, "permission cache entry invalidated");
        }
    }

    /// Drop everything. Used after a bulk path rebuild.
    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        let dropped = entries.len();
        entries.clear();
        debug!(dropped, "permission cache cleared");
    }

    /// Number of cached entries, fresh or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
