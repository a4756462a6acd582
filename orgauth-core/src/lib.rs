//! # Orgauth Core
//!
//! Domain types and pure algorithms for the orgauth authorization
//! engine: the materialized-path codec, the fixed five-level hierarchy
//! rank table, org-node/role/principal types, and parsed permission
//! values.
//!
//! Everything in this crate is synchronous and side-effect free; the
//! stores, caches and operations that act on these types live in
//! `orgauth-engine`.

#![warn(missing_docs)]

pub mod error;
pub mod hierarchy;
pub mod path;
pub mod permission;
pub mod types;

pub use error::{Error, Result};
pub use hierarchy::{ActorRank, EntityKind};
pub use permission::{Permission, PermissionSet, Scope};
pub use types::{Assignment, OrgNode, PathChange, Principal, Role, TargetRef};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::hierarchy::{ActorRank, EntityKind};
    pub use crate::path;
    pub use crate::permission::{ActionPattern, Permission, PermissionSet, ResourcePattern, Scope};
    pub use crate::types::{Assignment, OrgNode, PathChange, Principal, Role, TargetRef};
}
