//! Audit sink for structural changes.
//!
//! The engine emits one structured event per successful move. Delivery
//! is fire-and-forget from the engine's point of view: the sink cannot
//! fail the operation that produced the event.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgauth_core::hierarchy::EntityKind;
use orgauth_core::types::PathChange;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Structured "entity moved" event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMovedEvent {
    /// Unique event id.
    pub event_id: Uuid,
    /// When the move committed.
    pub timestamp: DateTime<Utc>,
    /// Kind of the moved entity.
    pub kind: EntityKind,
    /// Id of the moved entity.
    pub entity_id: String,
    /// Principal that requested the move.
    pub actor_id: String,
    /// Every affected node's rewrite, the moved entity first.
    pub changes: Vec<PathChange>,
}

impl EntityMovedEvent {
    /// Build an event for a committed move.
    pub fn new(kind: EntityKind, entity_id: &str, actor_id: &str, changes: Vec<PathChange>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
            entity_id: entity_id.to_string(),
            actor_id: actor_id.to_string(),
            changes,
        }
    }
}

/// Receiver of audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record a committed move. Must not block the caller on downstream
    /// failures; swallow and log instead.
    async fn entity_moved(&self, event: &EntityMovedEvent);
}

/// Default sink: structured tracing output.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn entity_moved(&self, event: &EntityMovedEvent) {
        let moved = event.changes.first();
        info!(
            event_id = %event.event_id,
            kind = %event.kind,
            entity = %event.entity_id,
            actor = %event.actor_id,
            old_path = moved.map(|c| c.old_path.as_str()).unwrap_or(""),
            new_path = moved.map(|c| c.new_path.as_str()).unwrap_or(""),
            affected = event.changes.len(),
            "entity moved"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes() {
        let event = EntityMovedEvent::new(
            EntityKind::Church,
            "c3",
            "admin",
            vec![PathChange {
                node_id: "c3".into(),
                old_path: "u1/conf2/c3".into(),
                new_path: "u1/conf5/c3".into(),
            }],
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "church");
        assert_eq!(json["changes"][0]["new_path"], "u1/conf5/c3");
    }
}
