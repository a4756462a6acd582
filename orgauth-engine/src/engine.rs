//! The authorization engine facade.
//!
//! Wires the cache, resolver, scope validator, reparent operation,
//! rebuild and audit sink behind the three operations consumers call:
//! `authorize`, `move_entity` (plus its batch form) and
//! `rebuild_all_paths`.

use crate::audit::{AuditSink, EntityMovedEvent, TracingAuditSink};
use crate::cache::PermissionCache;
use crate::config::AuthzConfig;
use crate::rebuild::{PathRebuild, RebuildReport};
use crate::reparent::{BatchMoveError, BatchMoveReport, MoveOutcome, MoveRequest, ReparentOperation};
use crate::resolver::RoleResolver;
use crate::scope;
use crate::store::{EntityStore, RoleStore};
use orgauth_core::error::{Error, Result};
use orgauth_core::hierarchy::{ActorRank, EntityKind};
use orgauth_core::path;
use orgauth_core::permission::Scope;
use orgauth_core::types::TargetRef;
use std::sync::Arc;
use tracing::{debug, warn};

/// The acting principal of an administrative operation: who they are,
/// how they rank, and where in the tree their authority is rooted.
#[derive(Debug, Clone)]
pub struct ActorContext {
    /// Principal id, recorded in audit events.
    pub principal_id: String,
    /// Authority rank; super admins precede level 0.
    pub rank: ActorRank,
    /// Root of the actor's scope; empty means global.
    pub path: String,
}

impl ActorContext {
    /// Actor scoped to a node of the tree.
    pub fn at(principal_id: &str, rank: ActorRank, path: &str) -> Self {
        Self {
            principal_id: principal_id.to_string(),
            rank,
            path: path.to_string(),
        }
    }

    /// Super-admin actor with global scope.
    pub fn super_admin(principal_id: &str) -> Self {
        Self {
            principal_id: principal_id.to_string(),
            rank: ActorRank::SuperAdmin,
            path: String::new(),
        }
    }
}

/// Hierarchical authorization engine.
pub struct AuthzEngine {
    entities: Arc<dyn EntityStore>,
    roles: Arc<dyn RoleStore>,
    resolver: RoleResolver,
    cache: PermissionCache,
    reparent: ReparentOperation,
    rebuild: PathRebuild,
    audit: Arc<dyn AuditSink>,
    audit_enabled: bool,
}

impl AuthzEngine {
    /// Start building an engine.
    pub fn builder() -> AuthzEngineBuilder {
        AuthzEngineBuilder::new()
    }

    /// Decide whether a principal may perform `permission`
    /// (`"resource.action"`) at the requested scope on the target.
    ///
    /// Denial is `Ok(false)`, never an error; the only errors are bad
    /// input (malformed permission) and store failures. An unknown
    /// principal denies.
    pub async fn authorize(
        &self,
        principal_id: &str,
        permission: &str,
        requested_scope: Option<Scope>,
        target: &TargetRef,
    ) -> Result<bool> {
        let (resource, action) = split_permission(permission)?;

        let Some(principal) = self.roles.find_principal(principal_id).await? else {
            warn!(principal = %principal_id, "authorize: unknown principal, denying");
            return Ok(false);
        };

        let permissions = self.cache.get_or_resolve(principal_id, &self.resolver).await?;

        let allowed = if permissions.grants_all() {
            true
        } else {
            // Scope validation runs against each node the principal is
            // assigned at; any satisfying location allows.
            let mut actor_paths = Vec::new();
            for assignment in &principal.assignments {
                match self.entities.find_node(&assignment.node_id).await? {
                    Some(node) => actor_paths.push(node.path),
                    None => warn!(
                        principal = %principal_id,
                        node = %assignment.node_id,
                        "assignment references missing node"
                    ),
                }
            }
            actor_paths.sort_unstable();
            actor_paths.dedup();

            if actor_paths.is_empty() {
                scope::has_permission(
                    &permissions,
                    resource,
                    action,
                    requested_scope,
                    None,
                    principal_id,
                    target,
                )
            } else {
                actor_paths.iter().any(|actor_path| {
                    scope::has_permission(
                        &permissions,
                        resource,
                        action,
                        requested_scope,
                        Some(actor_path),
                        principal_id,
                        target,
                    )
                })
            }
        };

        debug!(
            principal = %principal_id,
            permission = %permission,
            scope = ?requested_scope,
            target = %target.path,
            allowed,
            "authorization decision"
        );
        Ok(allowed)
    }

    /// Whether an actor may create an entity of `kind` under the given
    /// parent path: the actor's rank must strictly precede the entity's
    /// level and the parent must lie inside the actor's own scope.
    pub fn can_create(&self, actor: &ActorContext, kind: EntityKind, parent_path: &str) -> bool {
        actor.rank.can_create(kind) && path::is_subtree(parent_path, &actor.path)
    }

    /// Move an entity (and its whole subtree) under a new parent.
    ///
    /// The actor must rank above the moved entity's level and both the
    /// entity and the new parent must lie inside the actor's scope. On
    /// success, affected principals' cached permission sets are
    /// invalidated and an audit event is emitted.
    pub async fn move_entity(
        &self,
        kind: EntityKind,
        entity_id: &str,
        new_parent_id: &str,
        actor: &ActorContext,
    ) -> Result<MoveOutcome> {
        let entity = self
            .entities
            .find_node(entity_id)
            .await?
            .filter(|n| n.kind == kind)
            .ok_or_else(|| Error::entity_not_found(format!("{}:{}", kind, entity_id)))?;
        let parent = self
            .entities
            .find_node(new_parent_id)
            .await?
            .ok_or_else(|| Error::parent_not_found(new_parent_id))?;

        if !actor.rank.can_manage(entity.level()) {
            return Err(Error::validation(format!(
                "actor {} does not rank above level {}",
                actor.principal_id,
                entity.level()
            )));
        }
        if !path::is_subtree(&entity.path, &actor.path)
            || !path::is_subtree(&parent.path, &actor.path)
        {
            return Err(Error::validation(format!(
                "move of {} is outside the scope of actor {}",
                entity_id, actor.principal_id
            )));
        }

        let outcome = self.reparent.execute(kind, entity_id, new_parent_id).await?;

        if !outcome.changes.is_empty() {
            self.invalidate_affected(&outcome).await;
            if self.audit_enabled {
                let event = EntityMovedEvent::new(
                    kind,
                    entity_id,
                    &actor.principal_id,
                    outcome.changes.clone(),
                );
                self.audit.entity_moved(&event).await;
            }
        }
        Ok(outcome)
    }

    /// Move several entities; each is an independent sub-transaction
    /// and earlier successes survive later failures.
    pub async fn move_entities_batch(
        &self,
        requests: &[MoveRequest],
        actor: &ActorContext,
    ) -> BatchMoveReport {
        let mut report = BatchMoveReport::default();
        for request in requests {
            match self
                .move_entity(request.kind, &request.entity_id, &request.new_parent_id, actor)
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

    /// Recompute every node's path from its parent, top-down. A wet run
    /// ends with a full cache clear; dry runs write nothing and clear
    /// nothing.
    pub async fn rebuild_all_paths(&self, dry_run: bool) -> Result<RebuildReport> {
        let report = self.rebuild.run(dry_run).await?;
        if !dry_run {
            self.cache.invalidate_all().await;
        }
        Ok(report)
    }

    /// The injected permission cache, for assignment-change
    /// invalidation by the caller.
    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    async fn invalidate_affected(&self, outcome: &MoveOutcome) {
        let node_ids: Vec<String> = outcome
            .changes
            .iter()
            .map(|c| c.node_id.clone())
            .collect();
        match self.roles.principals_assigned_to(&node_ids).await {
            Ok(principal_ids) => {
                for principal_id in principal_ids {
                    self.cache.invalidate(&principal_id).await;
                }
            }
            Err(err) => {
                // Can't tell who is affected; drop everything rather
                // than serve stale scopes.
                warn!(error = %err, "invalidation lookup failed, clearing cache");
                self.cache.invalidate_all().await;
            }
        }
    }
}

// The request form is plain `resource.action`; the scope travels as a
// separate argument, so a `:scope` suffix here is a caller bug and
// surfaces as an error rather than a silent deny.
fn split_permission(permission: &str) -> Result<(&str, &str)> {
    match permission.split_once('.') {
        Some((resource, action))
            if !resource.is_empty()
                && !action.is_empty()
                && !action.contains('.')
                && !permission.contains(':') =>
        {
            Ok((resource, action))
        }
        _ => Err(Error::validation(format!(
            "malformed permission request: {}",
            permission
        ))),
    }
}

/// Builder for [`AuthzEngine`].
pub struct AuthzEngineBuilder {
    entity_store: Option<Arc<dyn EntityStore>>,
    role_store: Option<Arc<dyn RoleStore>>,
    audit_sink: Option<Arc<dyn AuditSink>>,
    config: AuthzConfig,
}

impl AuthzEngineBuilder {
    /// Empty builder with default configuration.
    pub fn new() -> Self {
        Self {
            entity_store: None,
            role_store: None,
            audit_sink: None,
            config: AuthzConfig::default(),
        }
    }

    /// Set the entity store.
    pub fn with_entity_store(mut self, store: Arc<dyn EntityStore>) -> Self {
        self.entity_store = Some(store);
        self
    }

    /// Set the role store.
    pub fn with_role_store(mut self, store: Arc<dyn RoleStore>) -> Self {
        self.role_store = Some(store);
        self
    }

    /// Set the audit sink; defaults to [`TracingAuditSink`].
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: AuthzConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the engine. Fails if a store is missing or the
    /// configuration is invalid.
    pub fn build(self) -> Result<AuthzEngine> {
        self.config.validate()?;
        let entities = self
            .entity_store
            .ok_or_else(|| Error::configuration("entity store is required"))?;
        let roles = self
            .role_store
            .ok_or_else(|| Error::configuration("role store is required"))?;
        let audit = self
            .audit_sink
            .unwrap_or_else(|| Arc::new(TracingAuditSink));

        Ok(AuthzEngine {
            resolver: RoleResolver::new(roles.clone()),
            cache: PermissionCache::new(&self.config.cache),
            reparent: ReparentOperation::new(entities.clone(), self.config.retry.clone()),
            rebuild: PathRebuild::new(entities.clone()),
            entities,
            roles,
            audit,
            audit_enabled: self.config.audit_enabled,
        })
    }
}

impl Default for AuthzEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
