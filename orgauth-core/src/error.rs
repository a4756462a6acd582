//! Error types for orgauth.
//!
//! This module defines all error types used throughout the orgauth crates.
//! Errors are split into permanent failures (bad path grammar, level
//! mismatches, cycles) and transient failures (concurrency conflicts,
//! store outages, timeouts) so callers can decide whether a retry is
//! worthwhile.
//!
//! A denied permission check is never an error: the authorization hot
//! path returns `Ok(false)` and stays exception-free.
//!
//! # Examples
//!
//! ```rust
//! use orgauth_core::error::{Error, Result};
//!
//! fn example_function() -> Result<String> {
//!     Err(Error::validation("path segment contains '-'"))
//! }
//! ```

use thiserror::Error;

/// Result type alias for orgauth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for orgauth operations.
///
/// Covers everything from path-grammar violations to store-level
/// concurrency conflicts. Each variant carries enough context to log a
/// useful message without a backtrace.
#[derive(Debug, Error)]
pub enum Error {
    /// The path string violates the materialized-path grammar.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A hierarchy-level constraint was violated (e.g. new parent is not
    /// exactly one level above the moved entity).
    #[error("Level mismatch: {0}")]
    LevelMismatch(String),

    /// Generic validation failure (bad permission string, bad scope, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested entity does not exist in the store.
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// The requested parent entity does not exist in the store.
    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    /// A role referenced by an assignment does not exist.
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// The principal does not exist in the role store.
    #[error("Principal not found: {0}")]
    PrincipalNotFound(String),

    /// The operation would introduce a cycle into the hierarchy.
    #[error("Circular dependency: {0}")]
    CircularDependency(String),

    /// Another writer modified the affected subtree concurrently.
    /// Transient; the whole operation may be retried.
    #[error("Concurrent modification: {0}")]
    ConcurrencyConflict(String),

    /// The backing store is unavailable. Transient infrastructure
    /// failure surfaced at the store-collaborator boundary.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The operation exceeded its deadline.
    #[error("Timeout")]
    Timeout,

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error (invalid settings, missing config, etc.).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Catch-all for other error types.
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a new invalid-path error.
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    /// Create a new level-mismatch error.
    pub fn level_mismatch(msg: impl Into<String>) -> Self {
        Self::LevelMismatch(msg.into())
    }

    /// Create a new validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new entity-not-found error.
    pub fn entity_not_found(id: impl Into<String>) -> Self {
        Self::EntityNotFound(id.into())
    }

    /// Create a new parent-not-found error.
    pub fn parent_not_found(id: impl Into<String>) -> Self {
        Self::ParentNotFound(id.into())
    }

    /// Create a new circular-dependency error.
    pub fn circular_dependency(msg: impl Into<String>) -> Self {
        Self::CircularDependency(msg.into())
    }

    /// Create a new concurrency-conflict error.
    pub fn concurrency_conflict(msg: impl Into<String>) -> Self {
        Self::ConcurrencyConflict(msg.into())
    }

    /// Create a new configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Check whether the error is transient and the whole operation may
    /// be retried.
    ///
    /// Permanent errors (validation, cycles, missing entities) will fail
    /// the same way on every attempt and must be surfaced directly.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use orgauth_core::error::Error;
    ///
    /// assert!(Error::concurrency_conflict("stale path").is_retryable());
    /// assert!(!Error::circular_dependency("c3 under itself").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict(_) | Self::StoreUnavailable(_) | Self::Timeout
        )
    }

    /// Check whether the error was caused by bad input rather than by
    /// system state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidPath(_) | Self::LevelMismatch(_) | Self::Validation(_)
        )
    }
}
