//! Bulk path rebuild.
//!
//! Recomputes every node's materialized path top-down from its parent's
//! current path. The run is idempotent: a second pass with no
//! intervening writes updates zero entities. Per-entity failures are
//! collected into the report instead of aborting the run, and dry-run
//! mode performs zero writes regardless of what it finds.

use crate::store::{EntityStore, RewriteBatch};
use chrono::{DateTime, Utc};
use orgauth_core::error::Result;
use orgauth_core::hierarchy::EntityKind;
use orgauth_core::path;
use orgauth_core::types::{OrgNode, PathChange};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Report of one rebuild run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildReport {
    /// Nodes examined.
    pub processed: usize,
    /// Nodes whose path differed from the recomputed one. In dry-run
    /// mode these are the nodes that WOULD be updated.
    pub updated: usize,
    /// Per-entity failures; the run continues past them.
    pub errors: Vec<RebuildError>,
    /// True if no writes were performed.
    pub dry_run: bool,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

/// One entity the rebuild could not process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildError {
    /// Id of the failed entity.
    pub entity_id: String,
    /// Why it failed.
    pub error: String,
}

/// Top-down path recomputation over an entity store.
pub struct PathRebuild {
    store: Arc<dyn EntityStore>,
}

impl PathRebuild {
    /// Create a rebuild over the given store.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Recompute all paths, level by level from the unions down, so
    /// every parent's path is already settled when its children are
    /// examined.
    pub async fn run(&self, dry_run: bool) -> Result<RebuildReport> {
        let mut report = RebuildReport {
            processed: 0,
            updated: 0,
            errors: Vec::new(),
            dry_run,
            finished_at: Utc::now(),
        };

        for kind in EntityKind::ALL {
            let nodes = self.store.nodes_by_kind(kind).await?;
            for node in nodes {
                report.processed += 1;
                match self.expected_path(&node).await {
                    Ok(expected) if expected == node.path => {}
                    Ok(expected) => {
                        report.updated += 1;
                        if !dry_run {
                            let batch = RewriteBatch::rewrites(vec![PathChange {
                                node_id: node.id.clone(),
                                old_path: node.path.clone(),
                                new_path: expected.clone(),
                            }]);
                            if let Err(err) = self.store.apply_rewrites(&batch).await {
                                warn!(entity = %node.id, error = %err, "rebuild write failed");
                                report.updated -= 1;
                                report.errors.push(RebuildError {
                                    entity_id: node.id.clone(),
                                    error: err.to_string(),
                                });
                            }
                        }
                    }
                    Err(err) => {
                        report.errors.push(RebuildError {
                            entity_id: node.id.clone(),
                            error: err.to_string(),
                        });
                    }
                }
            }
        }

        report.finished_at = Utc::now();
        info!(
            processed = report.processed,
            updated = report.updated,
            errors = report.errors.len(),
            dry_run,
            "path rebuild finished"
        );
        Ok(report)
    }

    async fn expected_path(&self, node: &OrgNode) -> Result<String> {
        if node.level() == 0 {
            return Ok(node.id.clone());
        }
        let parent_id = node.parent_id.as_deref().ok_or_else(|| {
            orgauth_core::Error::parent_not_found(format!("{} has no parent id", node.id))
        })?;
        let parent = self
            .store
            .find_node(parent_id)
            .await?
            .ok_or_else(|| orgauth_core::Error::parent_not_found(parent_id))?;
        Ok(path::join(&parent.path, &node.segment()))
    }
}
