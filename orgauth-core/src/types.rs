//! Domain types for the organizational tree and its principals.

use crate::error::{Error, Result};
use crate::hierarchy::EntityKind;
use crate::path;
use crate::permission::Permission;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One node of the organizational tree.
///
/// Invariants, enforced at construction and preserved by the reparent
/// operation:
/// - `path` has exactly `level + 1` segments;
/// - a level-0 path equals the node's own id;
/// - for deeper nodes, `path` = parent path + "/" + own segment;
/// - the node's own id never appears as a non-terminal segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgNode {
    /// Stable entity id, unique within its kind.
    pub id: String,
    /// Entity kind; fixes the hierarchy level.
    pub kind: EntityKind,
    /// Materialized path from the root union down to this node.
    pub path: String,
    /// Parent entity id; `None` only for unions.
    pub parent_id: Option<String>,
}

impl OrgNode {
    /// Create a root node (a union). Its path is its own id.
    pub fn root(id: &str) -> Result<Self> {
        let node = Self {
            id: id.to_string(),
            kind: EntityKind::Union,
            path: id.to_string(),
            parent_id: None,
        };
        node.check_invariants()?;
        Ok(node)
    }

    /// Create a child node under a verified parent. The path is derived
    /// from the parent's current path; the parent must sit exactly one
    /// level above.
    pub fn child(kind: EntityKind, id: &str, parent: &OrgNode) -> Result<Self> {
        if parent.kind.level() + 1 != kind.level() {
            return Err(Error::level_mismatch(format!(
                "{} cannot be a child of {}",
                kind, parent.kind
            )));
        }
        let node = Self {
            id: id.to_string(),
            kind,
            path: path::join(&parent.path, &path::encode_segment(kind, id)),
            parent_id: Some(parent.id.clone()),
        };
        node.check_invariants()?;
        Ok(node)
    }

    /// Hierarchy level of this node, fixed by its kind.
    pub fn level(&self) -> u8 {
        self.kind.level()
    }

    /// The path segment this node contributes to its descendants.
    pub fn segment(&self) -> String {
        path::encode_segment(self.kind, &self.id)
    }

    /// Verify the node's path invariants.
    pub fn check_invariants(&self) -> Result<()> {
        if !path::validate(&self.path) {
            return Err(Error::invalid_path(self.path.clone()));
        }
        if path::depth(&self.path) != self.level() as usize + 1 {
            return Err(Error::invalid_path(format!(
                "{}: depth {} does not match level {}",
                self.path,
                path::depth(&self.path),
                self.level()
            )));
        }
        if self.level() == 0 && self.path != self.id {
            return Err(Error::invalid_path(format!(
                "root path {} differs from id {}",
                self.path, self.id
            )));
        }
        if path::contains_non_terminal(&self.path, &self.segment()) {
            return Err(Error::circular_dependency(format!(
                "{} appears as its own ancestor in {}",
                self.id, self.path
            )));
        }
        Ok(())
    }
}

impl fmt::Display for OrgNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A role document, shaped as stored by the role store. Permission
/// tokens are parsed into [`Permission`] values on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique role name.
    pub name: String,
    /// Hierarchy level this role operates at.
    pub hierarchy_level: u8,
    /// Parsed permission grants.
    pub permissions: Vec<Permission>,
    /// Levels this role is entitled to manage.
    #[serde(default)]
    pub can_manage: Vec<u8>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Role {
    /// Create a role, parsing permission tokens. Fails on the first
    /// malformed token so bad role documents are rejected at load time,
    /// not at check time.
    pub fn new(name: &str, hierarchy_level: u8, tokens: &[&str]) -> Result<Self> {
        let permissions = tokens
            .iter()
            .map(|t| t.parse())
            .collect::<Result<Vec<Permission>>>()?;
        Ok(Self {
            name: name.to_string(),
            hierarchy_level,
            permissions,
            can_manage: Vec::new(),
            description: None,
        })
    }

    /// Builder-style: set the levels this role may manage.
    pub fn with_can_manage(mut self, levels: &[u8]) -> Self {
        self.can_manage = levels.to_vec();
        self
    }

    /// Builder-style: set the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// One role assignment: a role held at a specific node of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Node the role is held at.
    pub node_id: String,
    /// Name of the assigned role.
    pub role_name: String,
}

impl Assignment {
    /// Create an assignment.
    pub fn new(node_id: &str, role_name: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            role_name: role_name.to_string(),
        }
    }
}

/// An acting principal with its role assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Unique principal id.
    pub id: String,
    /// Super admins bypass resolution and hold the global wildcard.
    #[serde(default)]
    pub super_admin: bool,
    /// Role assignments across the tree.
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

impl Principal {
    /// Create an ordinary principal.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            super_admin: false,
            assignments: Vec::new(),
        }
    }

    /// Create a super-admin principal.
    pub fn super_admin(id: &str) -> Self {
        Self {
            id: id.to_string(),
            super_admin: true,
            assignments: Vec::new(),
        }
    }

    /// Builder-style: add an assignment.
    pub fn with_assignment(mut self, node_id: &str, role_name: &str) -> Self {
        self.assignments.push(Assignment::new(node_id, role_name));
        self
    }
}

/// The target of an authorization check: a location in the tree and,
/// for self-scoped checks, the principal identity it denotes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    /// Materialized path of the target entity.
    pub path: String,
    /// Principal identity the target denotes, if any. Only consulted by
    /// the `self` scope, which compares identities rather than paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
}

impl TargetRef {
    /// Target by path only.
    pub fn at_path(path: &str) -> Self {
        Self {
            path: path.to_string(),
            principal_id: None,
        }
    }

    /// Target denoting a principal at a path.
    pub fn principal(path: &str, principal_id: &str) -> Self {
        Self {
            path: path.to_string(),
            principal_id: Some(principal_id.to_string()),
        }
    }
}

/// One node's path rewrite produced by a reparent operation, consumed
/// for cache invalidation and audit logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathChange {
    /// Id of the rewritten node.
    pub node_id: String,
    /// Path before the move.
    pub old_path: String,
    /// Path after the move.
    pub new_path: String,
}
