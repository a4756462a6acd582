//! # Orgauth - Hierarchical Authorization for Rust
//!
//! Path-based authorization over a fixed five-level organizational tree
//! (union, conference, church, team, service).
//!
//! This crate re-exports the functionality of the constituent crates:
//! - `orgauth-core`: domain types, path codec and hierarchy rank table
//! - `orgauth-engine`: role resolution, scope validation, caching,
//!   subtree moves and path rebuilds

pub use orgauth_core as core;
pub use orgauth_engine as engine;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::core::prelude::*;
    #[allow(unused_imports)]
    pub use crate::engine::prelude::*;
}
