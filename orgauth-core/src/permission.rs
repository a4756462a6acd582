//! Parsed permission values.
//!
//! Role documents carry permissions as string tokens
//! (`"resource.action"`, `"resource.*"`, `"*"`, optionally suffixed
//! `":scope"`). Tokens are parsed once when roles load into a small
//! tagged value and compared structurally on every check; the hot path
//! never re-parses strings.
//!
//! # Examples
//!
//! ```rust
//! use orgauth_core::permission::{Permission, Scope};
//!
//! let perm: Permission = "organizations.update:own".parse().unwrap();
//! assert!(perm.matches("organizations", "update"));
//! assert_eq!(perm.scope, Some(Scope::Own));
//! assert_eq!(perm.to_string(), "organizations.update:own");
//! ```

use crate::error::{Error, Result};
use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Scope qualifier restricting a permission to a region of the
/// hierarchy relative to the acting principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// No restriction.
    All,
    /// Target path inside the actor's subtree (self-inclusive).
    Subordinate,
    /// Target is a direct child of the actor's node.
    Own,
    /// Target denotes the same principal identity.
    #[serde(rename = "self")]
    SelfOnly,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scope::All => "all",
            Scope::Subordinate => "subordinate",
            Scope::Own => "own",
            Scope::SelfOnly => "self",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Scope::All),
            "subordinate" => Ok(Scope::Subordinate),
            "own" => Ok(Scope::Own),
            "self" => Ok(Scope::SelfOnly),
            other => Err(Error::validation(format!("unknown scope: {}", other))),
        }
    }
}

/// Resource part of a permission: a named resource family or the
/// wildcard covering all of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourcePattern {
    /// Matches every resource family.
    Any,
    /// Matches one resource family by name.
    Named(String),
}

impl ResourcePattern {
    /// True if this pattern covers `resource`.
    pub fn matches(&self, resource: &str) -> bool {
        match self {
            ResourcePattern::Any => true,
            ResourcePattern::Named(name) => name == resource,
        }
    }
}

/// Action part of a permission: a named action or the per-resource
/// wildcard (`resource.*`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionPattern {
    /// Matches every action on the resource.
    Any,
    /// Matches one action by name.
    Named(String),
}

impl ActionPattern {
    /// True if this pattern covers `action`.
    pub fn matches(&self, action: &str) -> bool {
        match self {
            ActionPattern::Any => true,
            ActionPattern::Named(name) => name == action,
        }
    }
}

/// One parsed permission grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permission {
    /// Resource family the grant applies to.
    pub resource: ResourcePattern,
    /// Action the grant applies to.
    pub action: ActionPattern,
    /// Optional scope qualifier; `None` means unconditional.
    pub scope: Option<Scope>,
}

impl Permission {
    /// The global wildcard grant (`"*"`), covering everything.
    pub fn global() -> Self {
        Self {
            resource: ResourcePattern::Any,
            action: ActionPattern::Any,
            scope: None,
        }
    }

    /// An unconditional named grant.
    pub fn named(resource: &str, action: &str) -> Self {
        Self {
            resource: ResourcePattern::Named(resource.to_string()),
            action: ActionPattern::Named(action.to_string()),
            scope: None,
        }
    }

    /// A named grant with a scope qualifier.
    pub fn scoped(resource: &str, action: &str, scope: Scope) -> Self {
        Self {
            resource: ResourcePattern::Named(resource.to_string()),
            action: ActionPattern::Named(action.to_string()),
            scope: Some(scope),
        }
    }

    /// True if this is the global wildcard (`"*"`, no scope).
    pub fn is_global(&self) -> bool {
        self.resource == ResourcePattern::Any && self.action == ActionPattern::Any
    }

    /// True if this grant names the resource exactly and covers the
    /// action exactly (no wildcards).
    pub fn is_exact(&self) -> bool {
        matches!(self.resource, ResourcePattern::Named(_))
            && matches!(self.action, ActionPattern::Named(_))
    }

    /// True if this grant is a per-resource action wildcard.
    pub fn is_resource_wildcard(&self) -> bool {
        matches!(self.resource, ResourcePattern::Named(_))
            && self.action == ActionPattern::Any
    }

    /// True if this grant covers `resource`.`action`.
    pub fn matches(&self, resource: &str, action: &str) -> bool {
        self.resource.matches(resource) && self.action.matches(action)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.resource, &self.action) {
            (ResourcePattern::Any, _) => write!(f, "*")?,
            (ResourcePattern::Named(r), ActionPattern::Any) => write!(f, "{}.*", r)?,
            (ResourcePattern::Named(r), ActionPattern::Named(a)) => write!(f, "{}.{}", r, a)?,
        }
        if let Some(scope) = &self.scope {
            write!(f, ":{}", scope)?;
        }
        Ok(())
    }
}

impl FromStr for Permission {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        let (body, scope) = match token.split_once(':') {
            Some((body, scope_str)) => (body, Some(scope_str.parse::<Scope>()?)),
            None => (token, None),
        };

        if body == "*" {
            // The global wildcard is unconditional; a scope on it has
            // no defined meaning and would silently never match.
            if scope.is_some() {
                return Err(Error::validation(format!(
                    "malformed permission token: {}",
                    token
                )));
            }
            return Ok(Self {
                resource: ResourcePattern::Any,
                action: ActionPattern::Any,
                scope: None,
            });
        }

        let (resource, action) = body.split_once('.').ok_or_else(|| {
            Error::validation(format!("malformed permission token: {}", token))
        })?;
        if resource.is_empty() || resource == "*" || action.is_empty() {
            return Err(Error::validation(format!(
                "malformed permission token: {}",
                token
            )));
        }

        let action = if action == "*" {
            ActionPattern::Any
        } else if action.contains('.') || action.contains('*') {
            return Err(Error::validation(format!(
                "malformed permission token: {}",
                token
            )));
        } else {
            ActionPattern::Named(action.to_string())
        };

        Ok(Self {
            resource: ResourcePattern::Named(resource.to_string()),
            action,
            scope,
        })
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        struct TokenVisitor;

        impl Visitor<'_> for TokenVisitor {
            type Value = Permission;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a permission token string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Permission, E> {
                v.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(TokenVisitor)
    }
}

/// A principal's effective permission grants. Set semantics: order is
/// irrelevant and duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    grants: HashSet<Permission>,
}

impl PermissionSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The set containing only the global wildcard.
    pub fn all() -> Self {
        let mut set = Self::new();
        set.insert(Permission::global());
        set
    }

    /// Add a grant; duplicates collapse.
    pub fn insert(&mut self, permission: Permission) {
        self.grants.insert(permission);
    }

    /// Merge another set into this one.
    pub fn extend(&mut self, other: impl IntoIterator<Item = Permission>) {
        self.grants.extend(other);
    }

    /// True if the set holds the unscoped global wildcard.
    pub fn grants_all(&self) -> bool {
        self.grants.contains(&Permission::global())
    }

    /// Iterate the grants in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.grants.iter()
    }

    /// Number of distinct grants.
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// True if no grants are held.
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// True if the set holds this exact grant.
    pub fn contains(&self, permission: &Permission) -> bool {
        self.grants.contains(permission)
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self {
            grants: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PermissionSet {
    type Item = Permission;
    type IntoIter = std::collections::hash_set::IntoIter<Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.grants.into_iter()
    }
}
