//! Store seams consumed by the engine.
//!
//! The engine never walks a live object graph; nodes are referenced by
//! stable ids and resolved through these repository traits. Persistence
//! is the collaborator's concern: any backend works as long as
//! [`EntityStore::apply_rewrites`] is atomic and detects stale paths.

use async_trait::async_trait;
use orgauth_core::error::Result;
use orgauth_core::hierarchy::EntityKind;
use orgauth_core::types::{OrgNode, PathChange, Principal, Role};

/// A batch of path rewrites applied as one unit of work.
///
/// The store must apply the whole batch or none of it, and must reject
/// the batch with [`orgauth_core::Error::ConcurrencyConflict`] if any
/// node's current path no longer equals the recorded `old_path`
/// (another writer got there first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteBatch {
    /// Per-node path rewrites.
    pub changes: Vec<PathChange>,
    /// Optional parent-pointer update `(node_id, new_parent_id)`,
    /// applied inside the same unit of work. Set for reparent moves,
    /// absent for path rebuilds.
    pub parent_update: Option<(String, String)>,
}

impl RewriteBatch {
    /// Batch of path rewrites without a parent update.
    pub fn rewrites(changes: Vec<PathChange>) -> Self {
        Self {
            changes,
            parent_update: None,
        }
    }
}

/// Read/write access to the five hierarchy node collections.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Look up a node by id. Ids are unique across kinds.
    async fn find_node(&self, id: &str) -> Result<Option<OrgNode>>;

    /// All nodes inside the subtree rooted at `root_path`, including
    /// the root node itself.
    async fn find_by_path_prefix(&self, root_path: &str) -> Result<Vec<OrgNode>>;

    /// All nodes of one kind, in no particular order.
    async fn nodes_by_kind(&self, kind: EntityKind) -> Result<Vec<OrgNode>>;

    /// Apply a rewrite batch atomically. See [`RewriteBatch`] for the
    /// staleness contract.
    async fn apply_rewrites(&self, batch: &RewriteBatch) -> Result<()>;
}

/// Read access to principals and role documents.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Look up a principal by id.
    async fn find_principal(&self, id: &str) -> Result<Option<Principal>>;

    /// Look up a role document by name.
    async fn find_role(&self, name: &str) -> Result<Option<Role>>;

    /// Ids of all principals holding an assignment at any of the given
    /// nodes. Used to invalidate cached permission sets after a move.
    async fn principals_assigned_to(&self, node_ids: &[String]) -> Result<Vec<String>>;
}
