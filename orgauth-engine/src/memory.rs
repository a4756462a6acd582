//! In-memory store implementation.
//!
//! Reference implementation of the store seams, used by the test
//! suites and small deployments. All maps live behind a single
//! `tokio::sync::RwLock` each; a rewrite batch is validated and applied
//! under one write lock, which makes it a serializable transaction.

use crate::store::{EntityStore, RewriteBatch, RoleStore};
use async_trait::async_trait;
use orgauth_core::error::{Error, Result};
use orgauth_core::hierarchy::EntityKind;
use orgauth_core::path;
use orgauth_core::types::{OrgNode, Principal, Role};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory entity, role and principal store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    nodes: RwLock<HashMap<String, OrgNode>>,
    roles: RwLock<HashMap<String, Role>>,
    principals: RwLock<HashMap<String, Principal>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node after verifying its invariants.
    pub async fn upsert_node(&self, node: OrgNode) -> Result<()> {
        node.check_invariants()?;
        self.nodes.write().await.insert(node.id.clone(), node);
        Ok(())
    }

    /// Create a root union node and store it.
    pub async fn add_root(&self, id: &str) -> Result<OrgNode> {
        let node = OrgNode::root(id)?;
        self.upsert_node(node.clone()).await?;
        Ok(node)
    }

    /// Create a child node under an existing parent and store it. The
    /// path is derived from the parent's current path.
    pub async fn add_child(&self, kind: EntityKind, id: &str, parent_id: &str) -> Result<OrgNode> {
        let parent = self
            .find_node(parent_id)
            .await?
            .ok_or_else(|| Error::parent_not_found(parent_id))?;
        let node = OrgNode::child(kind, id, &parent)?;
        self.upsert_node(node.clone()).await?;
        Ok(node)
    }

    /// Insert or replace a role document.
    pub async fn upsert_role(&self, role: Role) {
        self.roles.write().await.insert(role.name.clone(), role);
    }

    /// Load a set of role documents, e.g. from
    /// [`crate::config::AuthzConfig::roles`].
    pub async fn load_roles(&self, roles: &[Role]) {
        let mut map = self.roles.write().await;
        for role in roles {
            map.insert(role.name.clone(), role.clone());
        }
    }

    /// Insert or replace a principal.
    pub async fn upsert_principal(&self, principal: Principal) {
        self.principals
            .write()
            .await
            .insert(principal.id.clone(), principal);
    }

    /// Number of stored nodes.
    pub async fn node_count(&self) -> usize {
        self.nodes.read().await.len()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_node(&self, id: &str) -> Result<Option<OrgNode>> {
        Ok(self.nodes.read().await.get(id).cloned())
    }

    async fn find_by_path_prefix(&self, root_path: &str) -> Result<Vec<OrgNode>> {
        let nodes = self.nodes.read().await;
        Ok(nodes
            .values()
            .filter(|n| path::is_subtree(&n.path, root_path))
            .cloned()
            .collect())
    }

    async fn nodes_by_kind(&self, kind: EntityKind) -> Result<Vec<OrgNode>> {
        let nodes = self.nodes.read().await;
        Ok(nodes.values().filter(|n| n.kind == kind).cloned().collect())
    }

    async fn apply_rewrites(&self, batch: &RewriteBatch) -> Result<()> {
        let mut nodes = self.nodes.write().await;

        // Validate the entire batch before touching anything, so a
        // stale entry leaves the store fully unchanged.
        for change in &batch.changes {
            let current = nodes
                .get(&change.node_id)
                .ok_or_else(|| Error::entity_not_found(&change.node_id))?;
            if current.path != change.old_path {
                return Err(Error::concurrency_conflict(format!(
                    "{}: expected path {}, found {}",
                    change.node_id, change.old_path, current.path
                )));
            }
        }
        if let Some((node_id, _)) = &batch.parent_update {
            if !nodes.contains_key(node_id) {
                return Err(Error::entity_not_found(node_id));
            }
        }

        for change in &batch.changes {
            if let Some(node) = nodes.get_mut(&change.node_id) {
                node.path = change.new_path.clone();
            }
        }
        if let Some((node_id, new_parent_id)) = &batch.parent_update {
            if let Some(node) = nodes.get_mut(node_id) {
                node.parent_id = Some(new_parent_id.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_principal(&self, id: &str) -> Result<Option<Principal>> {
        Ok(self.principals.read().await.get(id).cloned())
    }

    async fn find_role(&self, name: &str) -> Result<Option<Role>> {
        Ok(self.roles.read().await.get(name).cloned())
    }

    async fn principals_assigned_to(&self, node_ids: &[String]) -> Result<Vec<String>> {
        let principals = self.principals.read().await;
        Ok(principals
            .values()
            .filter(|p| {
                p.assignments
                    .iter()
                    .any(|a| node_ids.iter().any(|id| *id == a.node_id))
            })
            .map(|p| p.id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgauth_core::types::PathChange;

    async fn small_tree() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_root("u1").await.unwrap();
        store
            .add_child(EntityKind::Conference, "conf2", "u1")
            .await
            .unwrap();
        store
            .add_child(EntityKind::Church, "c3", "conf2")
            .await
            .unwrap();
        store.add_child(EntityKind::Team, "t9", "c3").await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_add_child_derives_path() {
        let store = small_tree().await;
        let team = store.find_node("t9").await.unwrap().unwrap();
        assert_eq!(team.path, "u1/conf2/c3/team_t9");
        assert_eq!(team.parent_id.as_deref(), Some("c3"));
    }

    #[tokio::test]
    async fn test_prefix_query_includes_root() {
        let store = small_tree().await;
        let subtree = store.find_by_path_prefix("u1/conf2/c3").await.unwrap();
        let mut ids: Vec<_> = subtree.iter().map(|n| n.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["c3", "t9"]);
    }

    #[tokio::test]
    async fn test_stale_batch_rejected_whole() {
        let store = small_tree().await;
        let batch = RewriteBatch::rewrites(vec![
            PathChange {
                node_id: "c3".into(),
                old_path: "u1/conf2/c3".into(),
                new_path: "u1/conf5/c3".into(),
            },
            PathChange {
                node_id: "t9".into(),
                old_path: "u1/WRONG/c3/team_t9".into(),
                new_path: "u1/conf5/c3/team_t9".into(),
            },
        ]);
        let err = store.apply_rewrites(&batch).await.unwrap_err();
        assert!(err.is_retryable());

        // Nothing was applied, not even the valid first entry.
        let church = store.find_node("c3").await.unwrap().unwrap();
        assert_eq!(church.path, "u1/conf2/c3");
    }

    #[tokio::test]
    async fn test_parent_update_applied_with_batch() {
        let store = small_tree().await;
        store
            .add_child(EntityKind::Conference, "conf5", "u1")
            .await
            .unwrap();
        let batch = RewriteBatch {
            changes: vec![
                PathChange {
                    node_id: "c3".into(),
                    old_path: "u1/conf2/c3".into(),
                    new_path: "u1/conf5/c3".into(),
                },
                PathChange {
                    node_id: "t9".into(),
                    old_path: "u1/conf2/c3/team_t9".into(),
                    new_path: "u1/conf5/c3/team_t9".into(),
                },
            ],
            parent_update: Some(("c3".into(), "conf5".into())),
        };
        store.apply_rewrites(&batch).await.unwrap();

        let church = store.find_node("c3").await.unwrap().unwrap();
        assert_eq!(church.path, "u1/conf5/c3");
        assert_eq!(church.parent_id.as_deref(), Some("conf5"));
    }
}
