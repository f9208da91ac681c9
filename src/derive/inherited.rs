//! Derives permissions from role inheritance

use super::record;
use crate::hierarchy::HierarchyResolver;
use crate::model::{ActionGraph, RoleGraph};
use crate::table::PermissionTable;
use crate::types::{ActionId, PermissionRef, PermissionValue, PolicyId, RoleId};
use indexmap::IndexSet;
use tracing::debug;

/// Derives permissions along the role hierarchy: every value held by a role
/// is copied to each of its transitive sub-roles, tagged `INHERITED`.
///
/// The pass pushes values down the deep sub-role closure of each scanned
/// role, so a role with no permissions of its own still receives everything
/// its super-roles hold, in a single pass.
pub struct InheritedPermissionDeriver<'m, M> {
    hierarchy: &'m HierarchyResolver<'m, M>,
}

impl<'m, M: RoleGraph + ActionGraph> InheritedPermissionDeriver<'m, M> {
    pub fn new(hierarchy: &'m HierarchyResolver<'m, M>) -> Self {
        Self { hierarchy }
    }

    /// Full mode: push every role's values down its sub-role closure.
    pub fn apply_full(
        &self,
        table: &mut PermissionTable,
        next: &mut PermissionTable,
    ) -> crate::error::Result<IndexSet<RoleId>> {
        let mut touched = IndexSet::new();
        let roles: Vec<RoleId> = table.roles().cloned().collect();
        for role in &roles {
            let entries = snapshot_role(table, role);
            self.push_down(role, &entries, table, next, &mut touched)?;
        }
        Ok(touched)
    }

    /// Delta mode: push only last round's additions, recorded in `source`,
    /// down the sub-role closure of each touched role.
    pub fn apply_delta(
        &self,
        table: &mut PermissionTable,
        source: &PermissionTable,
        next: &mut PermissionTable,
    ) -> crate::error::Result<IndexSet<RoleId>> {
        let mut touched = IndexSet::new();
        let roles: Vec<RoleId> = source.roles().cloned().collect();
        for role in &roles {
            let entries = snapshot_role(source, role);
            self.push_down(role, &entries, table, next, &mut touched)?;
        }
        Ok(touched)
    }

    fn push_down(
        &self,
        from_role: &str,
        entries: &[(ActionId, PolicyId, PermissionValue)],
        table: &mut PermissionTable,
        next: &mut PermissionTable,
        touched: &mut IndexSet<RoleId>,
    ) -> crate::error::Result<()> {
        let subs = self.hierarchy.sub_roles_of(from_role)?;
        if subs.is_empty() {
            return Ok(());
        }
        debug!(role = %from_role, sub_roles = subs.len(), values = entries.len(),
            "pushing permissions down the role hierarchy");
        for sub in &subs {
            for (action, policy, value) in entries {
                let origin = PermissionRef::new(from_role, action.clone(), policy.clone());
                record(
                    table,
                    next,
                    touched,
                    sub,
                    action,
                    policy,
                    PermissionValue::inherited(value, origin),
                );
            }
        }
        Ok(())
    }
}

fn snapshot_role(table: &PermissionTable, role: &str) -> Vec<(ActionId, PolicyId, PermissionValue)> {
    table
        .iter_role(role)
        .map(|(action, policy, value)| (action.clone(), policy.clone(), value.clone()))
        .collect()
}
