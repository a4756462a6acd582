//! Scope-qualified permission evaluation.
//!
//! Decides whether a permission set satisfies a concrete
//! `resource.action` request at a given scope, for an actor location
//! and a target location. Matching is first-match-decides and fails
//! closed: an empty set, an unmatched grant or a missing scope all
//! deny.

use orgauth_core::path;
use orgauth_core::permission::{PermissionSet, Scope};
use orgauth_core::types::TargetRef;

/// Evaluate a permission request against a resolved permission set.
///
/// Matching order, first match decides:
/// 1. the global wildcard allows anything;
/// 2. an exact unscoped `resource.action` grant allows unconditionally;
/// 3. an exact scoped grant allows iff the requested scope validates
///    against the actor and target locations;
/// 4. a `resource.*` wildcard grant follows the same two rules;
/// 5. otherwise deny.
///
/// `actor_path` is the actor's node location; `None` means the actor
/// holds no location in the tree, which denies every path-relative
/// scope.
pub fn has_permission(
    set: &PermissionSet,
    resource: &str,
    action: &str,
    scope: Option<Scope>,
    actor_path: Option<&str>,
    actor_id: &str,
    target: &TargetRef,
) -> bool {
    if set.grants_all() {
        return true;
    }

    let mut exact_scoped = false;
    let mut wildcard_unscoped = false;
    let mut wildcard_scoped = false;

    for grant in set.iter() {
        if grant.is_exact() && grant.matches(resource, action) {
            match grant.scope {
                None => return true,
                Some(_) => exact_scoped = true,
            }
        } else if grant.is_resource_wildcard() && grant.matches(resource, action) {
            match grant.scope {
                None => wildcard_unscoped = true,
                Some(_) => wildcard_scoped = true,
            }
        }
    }

    if exact_scoped {
        return validate_scope(scope, actor_path, actor_id, target);
    }
    if wildcard_unscoped {
        return true;
    }
    if wildcard_scoped {
        return validate_scope(scope, actor_path, actor_id, target);
    }
    false
}

/// Validate a requested scope against actor and target locations.
///
/// - `all` always validates;
/// - `subordinate` validates iff the target path lies inside the
///   actor's subtree (self-inclusive: a node is inside its own
///   subtree);
/// - `own` validates iff the target is a direct child of the actor's
///   node;
/// - `self` compares principal identities, not paths;
/// - a missing scope denies.
pub fn validate_scope(
    scope: Option<Scope>,
    actor_path: Option<&str>,
    actor_id: &str,
    target: &TargetRef,
) -> bool {
    match scope {
        Some(Scope::All) => true,
        Some(Scope::Subordinate) => match actor_path {
            Some(actor) => path::is_subtree(&target.path, actor),
            None => false,
        },
        Some(Scope::Own) => match actor_path {
            Some(actor) => !actor.is_empty() && path::parent(&target.path) == actor,
            None => false,
        },
        Some(Scope::SelfOnly) => target.principal_id.as_deref() == Some(actor_id),
        None => false,
    }
}
