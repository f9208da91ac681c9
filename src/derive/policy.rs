//! Propagates permissions across refined policies

use super::record;
use crate::model::PolicyGraph;
use crate::table::PermissionTable;
use crate::types::{PermissionRef, PermissionValue, RoleId};
use indexmap::IndexSet;
use tracing::debug;

/// Copies permission values from each refining policy into the policy it
/// refines.
///
/// Direction note: for policies P and Q where Q is declared to refine P,
/// values held under Q flow into P, tagged `INHERITED_POLICY`. The opposite
/// direction would mean general policies leak into specific ones; the flow
/// here lets a refinement add permissions to the policy it specializes.
pub struct PolicyRefinementDeriver<'m, M> {
    model: &'m M,
}

impl<'m, M: PolicyGraph> PolicyRefinementDeriver<'m, M> {
    pub fn new(model: &'m M) -> Self {
        Self { model }
    }

    /// Copy every (role, action) value held under a refining policy into the
    /// refined policy, mirroring new values into `next`. Returns the roles
    /// that received at least one new value.
    ///
    /// One application moves values a single refinement hop. The driver
    /// reapplies until the touched set comes back empty, which closes
    /// multi-hop chains independent of policy registration order.
    pub fn apply(&self, table: &mut PermissionTable, next: &mut PermissionTable) -> IndexSet<RoleId> {
        let mut touched = IndexSet::new();

        for policy in self.model.policies() {
            for refining in self.model.refined_by(&policy) {
                let mut pending = Vec::new();
                for (role, action, key_policy, value) in table.iter() {
                    if key_policy == &refining {
                        let origin =
                            PermissionRef::new(role.clone(), action.clone(), refining.clone());
                        pending.push((
                            role.clone(),
                            action.clone(),
                            PermissionValue::inherited_policy(value, origin),
                        ));
                    }
                }
                debug!(
                    policy = %policy,
                    refining = %refining,
                    candidates = pending.len(),
                    "propagating refined-policy permissions"
                );
                for (role, action, value) in pending {
                    record(table, next, &mut touched, &role, &action, &policy, value);
                }
            }
        }

        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemoryModel;
    use crate::types::{Grant, Provenance};

    #[test]
    fn test_values_flow_from_refining_to_refined() {
        let mut model = MemoryModel::new("default");
        model.add_refinement("strict", "loose");

        let mut table = PermissionTable::new();
        table.insert("user", "read", "loose", PermissionValue::explicit(Grant::Granted));

        let mut next = PermissionTable::new();
        let touched = PolicyRefinementDeriver::new(&model).apply(&mut table, &mut next);

        assert!(touched.contains("user"));
        let value = table.query("user", "read", "strict").next().unwrap();
        assert_eq!(value.provenance, Provenance::InheritedPolicy);
        assert_eq!(value.grant, Grant::Granted);
        assert_eq!(value.origin[0].policy, "loose");
        // nothing flows the other way
        assert_eq!(table.query("user", "read", "loose").count(), 1);
    }

    #[test]
    fn test_reapplying_adds_nothing() {
        let mut model = MemoryModel::new("default");
        model.add_refinement("strict", "loose");

        let mut table = PermissionTable::new();
        table.insert("user", "read", "loose", PermissionValue::explicit(Grant::Granted));

        let deriver = PolicyRefinementDeriver::new(&model);
        let mut next = PermissionTable::new();
        deriver.apply(&mut table, &mut next);

        let mut next = PermissionTable::new();
        let touched = deriver.apply(&mut table, &mut next);
        assert!(touched.is_empty());
        assert!(next.is_empty());
    }

    #[test]
    fn test_unrelated_policies_are_untouched() {
        let mut model = MemoryModel::new("default");
        model.add_policy("strict");

        let mut table = PermissionTable::new();
        table.insert("user", "read", "default", PermissionValue::explicit(Grant::Granted));

        let mut next = PermissionTable::new();
        let touched = PolicyRefinementDeriver::new(&model).apply(&mut table, &mut next);
        assert!(touched.is_empty());
        assert_eq!(table.len(), 1);
    }
}
