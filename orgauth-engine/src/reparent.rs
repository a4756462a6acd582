//! Atomic subtree move.
//!
//! Moves one node under a new parent and rewrites the materialized path
//! of every descendant in a single unit of work. Descendant paths are
//! spliced, not re-derived: the old root prefix is replaced by the new
//! one and the remainder of the string is left untouched, so a move of
//! a church never re-walks the ancestors of each team and service
//! below it.
//!
//! Permanent precondition failures (missing entities, level mismatch,
//! cycles) are rejected before any write. Concurrency conflicts are
//! transient: the whole operation retries a bounded number of times
//! with doubling backoff.

use crate::config::RetryConfig;
use crate::store::{EntityStore, RewriteBatch};
use orgauth_core::error::{Error, Result};
use orgauth_core::hierarchy::EntityKind;
use orgauth_core::path;
use orgauth_core::types::{OrgNode, PathChange};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of one committed move: every affected node's rewrite, the
/// moved entity first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveOutcome {
    /// Kind of the moved entity.
    pub kind: EntityKind,
    /// Id of the moved entity.
    pub entity_id: String,
    /// Rewrites applied, moved entity first, descendants after. Empty
    /// when the move was a no-op (already under the requested parent).
    pub changes: Vec<PathChange>,
}

impl MoveOutcome {
    /// The moved entity's own rewrite, if the move changed anything.
    pub fn root_change(&self) -> Option<&PathChange> {
        self.changes.first()
    }
}

/// One entry of a batch move request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Kind of the entity to move.
    pub kind: EntityKind,
    /// Id of the entity to move.
    pub entity_id: String,
    /// Id of the new parent.
    pub new_parent_id: String,
}

/// Per-entity outcome listing for a batch move. Entities are processed
/// as independent sub-transactions: a failure on one never rolls back
/// entities already committed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchMoveReport {
    /// Moves that committed.
    pub succeeded: Vec<MoveOutcome>,
    /// Moves that failed, with the failure message.
    pub failed: Vec<BatchMoveError>,
}

/// One failed entry of a batch move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMoveError {
    /// Id of the entity that failed to move.
    pub entity_id: String,
    /// Why the move was rejected.
    pub error: String,
}

/// Executes subtree moves against an entity store.
#[derive(Clone)]
pub struct ReparentOperation {
    store: Arc<dyn EntityStore>,
    retry: RetryConfig,
}

impl ReparentOperation {
    /// Create the operation over a store with a retry policy.
    pub fn new(store: Arc<dyn EntityStore>, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    /// Move an entity (and transitively its whole subtree) under a new
    /// parent.
    ///
    /// Retries the entire operation on transient conflicts, up to the
    /// configured bound; permanent failures surface immediately.
    pub async fn execute(
        &self,
        kind: EntityKind,
        entity_id: &str,
        new_parent_id: &str,
    ) -> Result<MoveOutcome> {
        let mut attempt = 0;
        loop {
            match self.try_once(kind, entity_id, new_parent_id).await {
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = backoff_delay(self.retry.backoff_ms, attempt);
                    warn!(
                        entity = %entity_id,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "move conflicted, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Process a batch of moves as independent sub-transactions.
    pub async fn execute_batch(&self, requests: &[MoveRequest]) -> BatchMoveReport {
        let mut report = BatchMoveReport::default();
        for request in requests {
            match self
                .execute(request.kind, &request.entity_id, &request.new_parent_id)
                .await
            {
                Ok(outcome) => report.succeeded.push(outcome),
                Err(err) => report.failed.push(BatchMoveError {
                    entity_id: request.entity_id.clone(),
                    error: err.to_string(),
                }),
            }
        }
        report
    }

    async fn try_once(
        &self,
        kind: EntityKind,
        entity_id: &str,
        new_parent_id: &str,
    ) -> Result<MoveOutcome> {
        let entity = self
            .store
            .find_node(entity_id)
            .await?
            .filter(|n| n.kind == kind)
            .ok_or_else(|| Error::entity_not_found(format!("{}:{}", kind, entity_id)))?;
        let parent = self
            .store
            .find_node(new_parent_id)
            .await?
            .ok_or_else(|| Error::parent_not_found(new_parent_id))?;

        check_preconditions(&entity, &parent)?;

        let new_path = path::join(&parent.path, &entity.segment());
        if new_path == entity.path {
            debug!(entity = %entity_id, path = %new_path, "move is a no-op");
            return Ok(MoveOutcome {
                kind,
                entity_id: entity_id.to_string(),
                changes: Vec::new(),
            });
        }

        // Moved node first, then every descendant with the old root
        // prefix spliced out.
        let subtree = self.store.find_by_path_prefix(&entity.path).await?;
        let mut changes = Vec::with_capacity(subtree.len());
        changes.push(PathChange {
            node_id: entity.id.clone(),
            old_path: entity.path.clone(),
            new_path: new_path.clone(),
        });
        for node in subtree {
            if node.id == entity.id {
                continue;
            }
            let spliced = format!("{}{}", new_path, &node.path[entity.path.len()..]);
            changes.push(PathChange {
                node_id: node.id,
                old_path: node.path,
                new_path: spliced,
            });
        }

        let batch = RewriteBatch {
            changes: changes.clone(),
            parent_update: Some((entity.id.clone(), parent.id.clone())),
        };
        self.store.apply_rewrites(&batch).await?;

        debug!(
            entity = %entity_id,
            old_path = %entity.path,
            new_path = %new_path,
            affected = changes.len(),
            "move committed"
        );
        Ok(MoveOutcome {
            kind,
            entity_id: entity_id.to_string(),
            changes,
        })
    }
}

/// Doubling backoff, saturating instead of overflowing the shift for
/// large attempt counts.
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(1u64 << attempt.min(32)))
}

/// Permanent precondition checks, run before any write.
fn check_preconditions(entity: &OrgNode, parent: &OrgNode) -> Result<()> {
    if entity.level() == 0 {
        return Err(Error::level_mismatch(format!(
            "{} is a root and cannot be reparented",
            entity.id
        )));
    }
    if parent.level() + 1 != entity.level() {
        return Err(Error::level_mismatch(format!(
            "new parent {} is level {}, expected level {}",
            parent.id,
            parent.level(),
            entity.level() - 1
        )));
    }

    let new_path = path::join(&parent.path, &entity.segment());
    if path::contains_non_terminal(&new_path, &entity.segment())
        || path::is_subtree(&parent.path, &entity.path)
    {
        return Err(Error::circular_dependency(format!(
            "moving {} under {} would embed the entity in its own path",
            entity.id, parent.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Store whose next `failures` rewrite attempts conflict before it
    /// starts committing.
    struct ConflictingStore {
        inner: Arc<MemoryStore>,
        failures: AtomicU32,
    }

    impl ConflictingStore {
        fn new(inner: Arc<MemoryStore>, failures: u32) -> Self {
            Self {
                inner,
                failures: AtomicU32::new(failures),
            }
        }
    }

    #[async_trait]
    impl EntityStore for ConflictingStore {
        async fn find_node(&self, id: &str) -> Result<Option<OrgNode>> {
            self.inner.find_node(id).await
        }

        async fn find_by_path_prefix(&self, root_path: &str) -> Result<Vec<OrgNode>> {
            self.inner.find_by_path_prefix(root_path).await
        }

        async fn nodes_by_kind(&self, kind: EntityKind) -> Result<Vec<OrgNode>> {
            self.inner.nodes_by_kind(kind).await
        }

        async fn apply_rewrites(&self, batch: &RewriteBatch) -> Result<()> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::concurrency_conflict("another writer got there first"));
            }
            self.inner.apply_rewrites(batch).await
        }
    }

    async fn fixture() -> (Arc<MemoryStore>, ReparentOperation) {
        let store = Arc::new(MemoryStore::new());
        store.add_root("u1").await.unwrap();
        store
            .add_child(EntityKind::Conference, "conf2", "u1")
            .await
            .unwrap();
        store
            .add_child(EntityKind::Conference, "conf5", "u1")
            .await
            .unwrap();
        store
            .add_child(EntityKind::Church, "c3", "conf2")
            .await
            .unwrap();
        store.add_child(EntityKind::Team, "t9", "c3").await.unwrap();
        store
            .add_child(EntityKind::Service, "s1", "t9")
            .await
            .unwrap();
        let op = ReparentOperation::new(store.clone(), RetryConfig::default());
        (store, op)
    }

    #[tokio::test]
    async fn test_move_rewrites_whole_subtree() {
        let (store, op) = fixture().await;
        let outcome = op
            .execute(EntityKind::Church, "c3", "conf5")
            .await
            .unwrap();

        assert_eq!(outcome.changes.len(), 3);
        let root = outcome.root_change().unwrap();
        assert_eq!(root.old_path, "u1/conf2/c3");
        assert_eq!(root.new_path, "u1/conf5/c3");

        // Suffixes below the moved node are untouched.
        let service = store.find_node("s1").await.unwrap().unwrap();
        assert_eq!(service.path, "u1/conf5/c3/team_t9/service_s1");
        let church = store.find_node("c3").await.unwrap().unwrap();
        assert_eq!(church.parent_id.as_deref(), Some("conf5"));
    }

    #[tokio::test]
    async fn test_level_mismatch_rejected() {
        let (_store, op) = fixture().await;
        let err = op.execute(EntityKind::Team, "t9", "conf5").await.unwrap_err();
        assert!(matches!(err, Error::LevelMismatch(_)));
    }

    #[tokio::test]
    async fn test_missing_parent_rejected() {
        let (_store, op) = fixture().await;
        let err = op.execute(EntityKind::Church, "c3", "conf9").await.unwrap_err();
        assert!(matches!(err, Error::ParentNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_entity_rejected() {
        let (_store, op) = fixture().await;
        let err = op.execute(EntityKind::Church, "cX", "conf5").await.unwrap_err();
        assert!(matches!(err, Error::EntityNotFound(_)));
        // Kind mismatch is indistinguishable from absence.
        let err = op.execute(EntityKind::Church, "t9", "conf5").await.unwrap_err();
        assert!(matches!(err, Error::EntityNotFound(_)));
    }

    #[tokio::test]
    async fn test_root_cannot_move() {
        let (_store, op) = fixture().await;
        let err = op.execute(EntityKind::Union, "u1", "conf5").await.unwrap_err();
        assert!(matches!(err, Error::LevelMismatch(_)));
    }

    #[test]
    fn test_cycle_rejected_in_preconditions() {
        let entity = OrgNode {
            id: "t9".into(),
            kind: EntityKind::Team,
            path: "u1/conf2/c3/team_t9".into(),
            parent_id: Some("c3".into()),
        };
        // A church whose (corrupt) path already embeds the moved
        // team's segment; the resulting path would contain the entity
        // as its own ancestor.
        let embedding_parent = OrgNode {
            id: "c_bad".into(),
            kind: EntityKind::Church,
            path: "u1/conf2/team_t9".into(),
            parent_id: Some("conf2".into()),
        };
        let err = check_preconditions(&entity, &embedding_parent).unwrap_err();
        assert!(matches!(err, Error::CircularDependency(_)));

        // A parent inside the moved subtree is equally a cycle.
        let nested_parent = OrgNode {
            id: "c_deep".into(),
            kind: EntityKind::Church,
            path: "u1/conf2/c3/team_t9/c_deep".into(),
            parent_id: None,
        };
        let err = check_preconditions(&entity, &nested_parent).unwrap_err();
        assert!(matches!(err, Error::CircularDependency(_)));
    }

    #[tokio::test]
    async fn test_transient_conflict_retried_to_success() {
        let (store, _) = fixture().await;
        let conflicting = Arc::new(ConflictingStore::new(store.clone(), 1));
        let op = ReparentOperation::new(
            conflicting,
            RetryConfig {
                max_retries: 2,
                backoff_ms: 1,
            },
        );

        let outcome = op.execute(EntityKind::Church, "c3", "conf5").await.unwrap();
        assert_eq!(outcome.changes.len(), 3);
        let church = store.find_node("c3").await.unwrap().unwrap();
        assert_eq!(church.path, "u1/conf5/c3");
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_conflict() {
        let (store, _) = fixture().await;
        // Every attempt conflicts.
        let conflicting = Arc::new(ConflictingStore::new(store.clone(), u32::MAX));
        let op = ReparentOperation::new(
            conflicting,
            RetryConfig {
                max_retries: 2,
                backoff_ms: 1,
            },
        );

        let err = op
            .execute(EntityKind::Church, "c3", "conf5")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConcurrencyConflict(_)));
        let church = store.find_node("c3").await.unwrap().unwrap();
        assert_eq!(church.path, "u1/conf2/c3");
    }

    #[test]
    fn test_backoff_doubles_and_saturates() {
        assert_eq!(backoff_delay(50, 0), Duration::from_millis(50));
        assert_eq!(backoff_delay(50, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(50, 2), Duration::from_millis(200));
        // Large attempt counts cap instead of overflowing the shift.
        assert_eq!(backoff_delay(50, 64), backoff_delay(50, 32));
        assert_eq!(backoff_delay(u64::MAX, 64), Duration::from_millis(u64::MAX));
    }

    #[tokio::test]
    async fn test_noop_move_touches_nothing() {
        let (store, op) = fixture().await;
        let outcome = op.execute(EntityKind::Church, "c3", "conf2").await.unwrap();
        assert!(outcome.changes.is_empty());
        let church = store.find_node("c3").await.unwrap().unwrap();
        assert_eq!(church.path, "u1/conf2/c3");
    }

    #[tokio::test]
    async fn test_batch_reports_per_entity() {
        let (store, op) = fixture().await;
        let report = op
            .execute_batch(&[
                MoveRequest {
                    kind: EntityKind::Church,
                    entity_id: "c3".into(),
                    new_parent_id: "conf5".into(),
                },
                MoveRequest {
                    kind: EntityKind::Church,
                    entity_id: "missing".into(),
                    new_parent_id: "conf5".into(),
                },
            ])
            .await;

        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].entity_id, "missing");

        // The earlier success stays committed despite the later failure.
        let church = store.find_node("c3").await.unwrap().unwrap();
        assert_eq!(church.path, "u1/conf5/c3");
    }
}
