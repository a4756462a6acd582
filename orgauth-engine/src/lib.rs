//! # Orgauth Engine
//!
//! Runtime of the orgauth authorization system: role resolution with a
//! TTL permission cache, scope-qualified permission checks, the atomic
//! subtree-move operation and the bulk path rebuild, all wired behind
//! the [`engine::AuthzEngine`] facade.
//!
//! Persistence and transport are collaborators, not concerns of this
//! crate: the engine consumes [`store::EntityStore`] and
//! [`store::RoleStore`] implementations and emits structural changes to
//! an [`audit::AuditSink`]. An in-memory reference store is provided
//! for tests and small deployments.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use orgauth_core::prelude::*;
//! use orgauth_engine::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     store.add_root("u1").await?;
//!     store
//!         .upsert_role(Role::new("union_admin", 0, &["conferences.*:subordinate"])?)
//!         .await;
//!     store
//!         .upsert_principal(Principal::new("alice").with_assignment("u1", "union_admin"))
//!         .await;
//!
//!     let engine = AuthzEngine::builder()
//!         .with_entity_store(store.clone())
//!         .with_role_store(store.clone())
//!         .build()?;
//!
//!     let allowed = engine
//!         .authorize(
//!             "alice",
//!             "conferences.update",
//!             Some(Scope::Subordinate),
//!             &TargetRef::at_path("u1"),
//!         )
//!         .await?;
//!     assert!(allowed);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod audit;
pub mod cache;
pub mod config;
pub mod engine;
pub mod memory;
pub mod rebuild;
pub mod reparent;
pub mod resolver;
pub mod scope;
pub mod store;

pub use engine::{ActorContext, AuthzEngine, AuthzEngineBuilder};

/// Common imports for engine consumers.
pub mod prelude {
    pub use crate::audit::{AuditSink, EntityMovedEvent, TracingAuditSink};
    pub use crate::cache::PermissionCache;
    pub use crate::config::{AuthzConfig, CacheConfig, RetryConfig};
    pub use crate::engine::{ActorContext, AuthzEngine, AuthzEngineBuilder};
    pub use crate::memory::MemoryStore;
    pub use crate::rebuild::{PathRebuild, RebuildReport};
    pub use crate::reparent::{
        BatchMoveReport, MoveOutcome, MoveRequest, ReparentOperation,
    };
    pub use crate::resolver::RoleResolver;
    pub use crate::store::{EntityStore, RewriteBatch, RoleStore};

    pub use orgauth_core::error::{Error, Result};
}
