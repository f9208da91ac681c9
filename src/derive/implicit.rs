//! Derives permissions from action composition

use super::record;
use crate::hierarchy::HierarchyResolver;
use crate::model::{ActionGraph, RoleGraph};
use crate::table::PermissionTable;
use crate::types::{ActionId, PermissionRef, PermissionValue, PolicyId, RoleId};
use indexmap::IndexSet;
use tracing::debug;

/// Pure query: is (role, action, policy) permitted, directly or because every
/// sub-action is permitted?
///
/// True if a positive value is already recorded at the key; otherwise, if the
/// action has sub-actions, true iff the predicate holds for every direct
/// sub-action (short-circuiting on the first miss). An action with neither a
/// recorded value nor sub-actions is not permitted — a vacuous composite is
/// false. Never mutates the table.
///
/// # Preconditions
///
/// The action graph must be acyclic: recursion is bounded only by the
/// hierarchy depth, so evaluating against a cyclic graph does not terminate.
/// Callers using the predicate outside a [`FixpointDriver`](super::FixpointDriver)
/// run (which cycle-checks every resource action up front) must validate
/// first, e.g. with
/// [`HierarchyResolver::sub_actions_of`](crate::hierarchy::HierarchyResolver::sub_actions_of).
pub struct ImplicitBySubactionPredicate<'m, M> {
    model: &'m M,
}

impl<'m, M: ActionGraph> ImplicitBySubactionPredicate<'m, M> {
    pub fn new(model: &'m M) -> Self {
        Self { model }
    }

    pub fn is_permitted(
        &self,
        table: &PermissionTable,
        role: &str,
        action: &str,
        policy: &str,
    ) -> bool {
        if table.has_positive(role, action, policy) {
            return true;
        }
        let subs = self.model.direct_sub_actions(action);
        if subs.is_empty() {
            return false;
        }
        subs.iter().all(|sub| self.is_permitted(table, role, sub, policy))
    }
}

/// Derives permissions along the action-composition hierarchy.
///
/// Two rules, applied per (role, action, policy):
///
/// 1. **Super-action rule** — a value recorded on any transitive super-action
///    is copied down to the action, tagged `IMPLICIT_SUPER`.
/// 2. **Sub-action rule** — an action with sub-actions gains a synthesized
///    positive value tagged `IMPLICIT_SUB` once every sub-action (recursively
///    down to leaves) is permitted for the (role, policy) pair.
///
/// Within one pass, rule 1 runs over all actions before rule 2, so composite
/// synthesis sees the copies made in the same pass.
pub struct ImplicitPermissionDeriver<'m, M> {
    hierarchy: &'m HierarchyResolver<'m, M>,
    predicate: ImplicitBySubactionPredicate<'m, M>,
}

impl<'m, M: RoleGraph + ActionGraph> ImplicitPermissionDeriver<'m, M> {
    pub fn new(hierarchy: &'m HierarchyResolver<'m, M>) -> Self {
        Self {
            predicate: ImplicitBySubactionPredicate::new(hierarchy.model()),
            hierarchy,
        }
    }

    /// Full mode: scan every role currently in the table.
    pub fn apply_full(
        &self,
        actions: &[ActionId],
        policies: &[PolicyId],
        table: &mut PermissionTable,
        next: &mut PermissionTable,
    ) -> crate::error::Result<IndexSet<RoleId>> {
        let roles: Vec<RoleId> = table.roles().cloned().collect();
        self.apply_to_roles(&roles, actions, policies, table, next)
    }

    /// Delta mode: rescan only the roles touched by the previous pass, as
    /// recorded in `source`. Values are still read from the full table.
    pub fn apply_delta(
        &self,
        actions: &[ActionId],
        policies: &[PolicyId],
        table: &mut PermissionTable,
        source: &PermissionTable,
        next: &mut PermissionTable,
    ) -> crate::error::Result<IndexSet<RoleId>> {
        let roles: Vec<RoleId> = source.roles().cloned().collect();
        self.apply_to_roles(&roles, actions, policies, table, next)
    }

    fn apply_to_roles(
        &self,
        roles: &[RoleId],
        actions: &[ActionId],
        policies: &[PolicyId],
        table: &mut PermissionTable,
        next: &mut PermissionTable,
    ) -> crate::error::Result<IndexSet<RoleId>> {
        let mut touched = IndexSet::new();

        // rule 1: copy down from transitive super-actions
        for role in roles {
            for action in actions {
                let supers = self.hierarchy.super_actions_of(action)?;
                let mut pending = Vec::new();
                for super_action in &supers {
                    for policy in policies {
                        for value in table.query(role, super_action, policy) {
                            let origin = PermissionRef::new(
                                role.clone(),
                                super_action.clone(),
                                policy.clone(),
                            );
                            pending.push((
                                policy.clone(),
                                PermissionValue::implicit_super(value, origin),
                            ));
                        }
                    }
                }
                for (policy, value) in pending {
                    record(table, next, &mut touched, role, action, &policy, value);
                }
            }
        }

        // rule 2: synthesize composites whose sub-actions are all permitted
        for role in roles {
            for action in actions {
                let subs = self.hierarchy.model().direct_sub_actions(action);
                if subs.is_empty() {
                    continue;
                }
                for policy in policies {
                    let all_permitted = subs
                        .iter()
                        .all(|sub| self.predicate.is_permitted(table, role, sub, policy));
                    if all_permitted {
                        debug!(role = %role, action = %action, policy = %policy,
                            "composite permitted through its sub-actions");
                        let origin = subs
                            .iter()
                            .map(|sub| {
                                PermissionRef::new(role.clone(), sub.clone(), policy.clone())
                            })
                            .collect();
                        record(
                            table,
                            next,
                            &mut touched,
                            role,
                            action,
                            policy,
                            PermissionValue::composite(origin),
                        );
                    }
                }
            }
        }

        Ok(touched)
    }
}
