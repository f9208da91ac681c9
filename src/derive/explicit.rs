//! Seeds the permission table from raw assignments

use crate::model::{ActionGraph, AssignmentSource, PolicyGraph};
use crate::table::PermissionTable;
use crate::types::{Diagnostic, PermissionValue};
use tracing::warn;

/// Builds the seed table of explicit permissions for one resource.
///
/// Never fails: an assignment whose role reference cannot be resolved is
/// skipped, and an assignment with zero or multiple attached policies falls
/// back to the default/first policy. Both conditions are recorded as
/// diagnostics and logged as warnings. Inheritance is not consulted here.
pub struct ExplicitPermissionCollector<'m, M> {
    model: &'m M,
}

impl<'m, M: ActionGraph + PolicyGraph + AssignmentSource> ExplicitPermissionCollector<'m, M> {
    pub fn new(model: &'m M) -> Self {
        Self { model }
    }

    /// Collect every explicit assignment on the resource's actions into a
    /// fresh table, appending recoverable conditions to `diagnostics`.
    pub fn collect(&self, resource: &str, diagnostics: &mut Vec<Diagnostic>) -> PermissionTable {
        let mut table = PermissionTable::new();
        let default_policy = self.model.default_policy();

        for action in self.model.actions_of(resource) {
            for assignment in self.model.assignments_of(&action) {
                let Some(role) = assignment.role else {
                    warn!(action = %action, "skipping assignment with unresolved role reference");
                    diagnostics.push(Diagnostic::UnresolvedRole {
                        action: action.clone(),
                    });
                    continue;
                };

                let policy = match assignment.policies.as_slice() {
                    [] => default_policy.clone(),
                    [only] => only.clone(),
                    [first, rest @ ..] => {
                        warn!(
                            role = %role,
                            action = %action,
                            chosen = %first,
                            "multiple policies on one assignment, taking the first"
                        );
                        diagnostics.push(Diagnostic::AmbiguousPolicy {
                            role: role.clone(),
                            action: action.clone(),
                            chosen: first.clone(),
                            ignored: rest.to_vec(),
                        });
                        first.clone()
                    }
                };

                table.insert(&role, &action, &policy, PermissionValue::explicit(assignment.grant));
            }
        }

        table
    }
}
