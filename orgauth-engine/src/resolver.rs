//! Effective permission resolution.
//!
//! Computes a principal's permission set from its role assignments.
//! Resolution is a pure function of current assignment and role data;
//! it holds no state of its own and is safe to recompute concurrently.

use crate::store::RoleStore;
use orgauth_core::error::Result;
use orgauth_core::hierarchy::EntityKind;
use orgauth_core::permission::{Permission, PermissionSet, Scope};
use orgauth_core::types::Principal;
use std::sync::Arc;
use tracing::warn;

/// Resolves principals to effective permission sets.
#[derive(Clone)]
pub struct RoleResolver {
    roles: Arc<dyn RoleStore>,
}

impl RoleResolver {
    /// Create a resolver over the given role store.
    pub fn new(roles: Arc<dyn RoleStore>) -> Self {
        Self { roles }
    }

    /// Compute the effective permission set for a principal.
    ///
    /// Super admins short-circuit to the global wildcard. Everyone else
    /// gets the union of their roles' grants, the static level-implied
    /// baseline keyed by their highest (numerically lowest) assigned
    /// level, and derived manage grants for every `can_manage` level
    /// strictly below that highest level.
    ///
    /// An assignment referencing a missing role is skipped with a
    /// warning rather than failing the whole resolution; fewer grants
    /// is the safe direction.
    pub async fn resolve(&self, principal: &Principal) -> Result<PermissionSet> {
        if principal.super_admin {
            return Ok(PermissionSet::all());
        }

        let mut set = PermissionSet::new();
        let mut highest_level: Option<u8> = None;
        let mut managed_levels: Vec<u8> = Vec::new();

        for assignment in &principal.assignments {
            let Some(role) = self.roles.find_role(&assignment.role_name).await? else {
                warn!(
                    principal = %principal.id,
                    role = %assignment.role_name,
                    node = %assignment.node_id,
                    "assignment references unknown role, skipping"
                );
                continue;
            };

            set.extend(role.permissions.iter().cloned());

            highest_level = Some(match highest_level {
                Some(current) => current.min(role.hierarchy_level),
                None => role.hierarchy_level,
            });

            managed_levels.extend(role.can_manage.iter().copied());
        }

        // Derived grants compare against the principal's highest level,
        // not the level of the role that contributed the entitlement: a
        // level-1 assignment lifts the manage reach of every other role
        // the principal holds.
        if let Some(level) = highest_level {
            set.extend(implied_grants(level));
            for managed in managed_levels {
                if managed > level {
                    if let Some(kind) = EntityKind::from_level(managed) {
                        set.insert(Permission::scoped(
                            kind.resource_family(),
                            "manage",
                            Scope::Subordinate,
                        ));
                    }
                }
            }
        }

        Ok(set)
    }

    /// Resolve by principal id, fetching the principal first. An
    /// unknown principal resolves to the empty set (fail closed).
    pub async fn resolve_id(&self, principal_id: &str) -> Result<PermissionSet> {
        match self.roles.find_principal(principal_id).await? {
            Some(principal) => self.resolve(&principal).await,
            None => {
                warn!(principal = %principal_id, "unknown principal, resolving to empty set");
                Ok(PermissionSet::new())
            }
        }
    }
}

/// Static per-level baseline: each level may view and create the
/// entity kind one level below it, within its own subtree. The leaf
/// level implies nothing.
pub fn implied_grants(level: u8) -> Vec<Permission> {
    match EntityKind::from_level(level).and_then(|k| k.child_kind()) {
        Some(child) => vec![
            Permission::scoped(child.resource_family(), "view", Scope::Subordinate),
            Permission::scoped(child.resource_family(), "create", Scope::Subordinate),
        ],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use orgauth_core::types::Role;

    async fn store_with_roles() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store
            .upsert_role(
                Role::new(
                    "conference_admin",
                    1,
                    &["churches.*:subordinate", "organizations.update:own"],
                )
                .unwrap()
                .with_can_manage(&[2, 3, 4]),
            )
            .await;
        store
            .upsert_role(Role::new("team_leader", 3, &["services.view:subordinate"]).unwrap())
            .await;
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_super_admin_short_circuit() {
        let resolver = RoleResolver::new(store_with_roles().await);
        let set = resolver
            .resolve(&Principal::super_admin("root"))
            .await
            .unwrap();
        assert!(set.grants_all());
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_union_of_role_grants() {
        let resolver = RoleResolver::new(store_with_roles().await);
        let principal = Principal::new("alice")
            .with_assignment("conf2", "conference_admin")
            .with_assignment("t9", "team_leader");
        let set = resolver.resolve(&principal).await.unwrap();

        assert!(set.contains(&"churches.*:subordinate".parse().unwrap()));
        assert!(set.contains(&"services.view:subordinate".parse().unwrap()));
        assert!(!set.grants_all());
    }

    #[tokio::test]
    async fn test_implied_grants_use_highest_level() {
        let resolver = RoleResolver::new(store_with_roles().await);
        let principal = Principal::new("alice")
            .with_assignment("t9", "team_leader")
            .with_assignment("conf2", "conference_admin");
        let set = resolver.resolve(&principal).await.unwrap();

        // Highest (numerically lowest) assigned level is 1, so the
        // baseline covers churches, not services.
        assert!(set.contains(&"churches.view:subordinate".parse().unwrap()));
        assert!(set.contains(&"churches.create:subordinate".parse().unwrap()));
        assert!(!set.contains(&"services.create:subordinate".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_derived_manage_grants() {
        let resolver = RoleResolver::new(store_with_roles().await);
        let principal = Principal::new("alice").with_assignment("conf2", "conference_admin");
        let set = resolver.resolve(&principal).await.unwrap();

        assert!(set.contains(&"churches.manage:subordinate".parse().unwrap()));
        assert!(set.contains(&"teams.manage:subordinate".parse().unwrap()));
        assert!(set.contains(&"services.manage:subordinate".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_manage_grants_key_on_highest_assigned_level() {
        let store = store_with_roles().await;
        // Level-1 role with no manage entitlements of its own, plus a
        // level-3 role entitled to manage level 2.
        store
            .upsert_role(Role::new("conference_clerk", 1, &["conferences.view:subordinate"]).unwrap())
            .await;
        store
            .upsert_role(
                Role::new("area_auditor", 3, &["teams.view:subordinate"])
                    .unwrap()
                    .with_can_manage(&[2]),
            )
            .await;
        let resolver = RoleResolver::new(store);
        let principal = Principal::new("alice")
            .with_assignment("conf2", "conference_clerk")
            .with_assignment("t9", "area_auditor");
        let set = resolver.resolve(&principal).await.unwrap();

        // Level 2 sits below the principal's highest level (1), so the
        // entitlement carried by the level-3 role still derives a grant.
        assert!(set.contains(&"churches.manage:subordinate".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_unknown_role_skipped() {
        let resolver = RoleResolver::new(store_with_roles().await);
        let principal = Principal::new("bob").with_assignment("conf2", "ghost_role");
        let set = resolver.resolve(&principal).await.unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_principal_resolves_empty() {
        let resolver = RoleResolver::new(store_with_roles().await);
        let set = resolver.resolve_id("nobody").await.unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_leaf_level_implies_nothing() {
        assert!(implied_grants(4).is_empty());
        assert_eq!(implied_grants(0).len(), 2);
    }
}
