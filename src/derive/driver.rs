//! Fixpoint orchestration over the derivation passes

use super::{
    ExplicitPermissionCollector, ImplicitPermissionDeriver, InheritedPermissionDeriver,
    PolicyRefinementDeriver,
};
use crate::error::Result;
use crate::hierarchy::HierarchyResolver;
use crate::model::PolicyModel;
use crate::table::PermissionTable;
use crate::types::Diagnostic;
use tracing::{debug, info};

/// Result of one derivation run. The table is immutable output from here on;
/// the caller owns it for querying and explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    /// Complete derived-permission table
    pub table: PermissionTable,

    /// Recoverable conditions met while seeding
    pub diagnostics: Vec<Diagnostic>,

    /// Number of converging rounds after the seed passes
    pub rounds: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrivePhase {
    Seed,
    Converging,
    Done,
}

/// Drives the derivation passes to a fixpoint.
///
/// SEED runs the explicit collector, then the policy-refinement, implicit,
/// and inherited passes in full mode to establish the baseline closure.
/// CONVERGING alternates the inherited and implicit passes, each restricted
/// to the roles touched by the previous step; a step that touches no role
/// ends the loop.
///
/// Termination: the value space per (role, action, policy) key is finite,
/// the table only grows, and the hierarchies are cycle-checked, so the round
/// count is bounded by the combined hierarchy depth.
pub struct FixpointDriver<'m, M> {
    model: &'m M,
}

impl<'m, M: PolicyModel> FixpointDriver<'m, M> {
    pub fn new(model: &'m M) -> Self {
        Self { model }
    }

    /// Compute the complete permission table for one resource.
    ///
    /// # Errors
    ///
    /// Fails with [`DeriveError::CyclicHierarchy`](crate::error::DeriveError)
    /// if a closure query meets a cycle in the role or action graph; no
    /// partial table is returned.
    pub fn derive(&self, resource: &str) -> Result<Derivation> {
        let hierarchy = HierarchyResolver::new(self.model);
        let actions = self.model.actions_of(resource);
        let policies = self.model.policies();

        // validate the action hierarchy up front: the composite predicate
        // recurses over direct sub-action edges
        for action in &actions {
            hierarchy.super_actions_of(action)?;
            hierarchy.sub_actions_of(action)?;
        }

        let collector = ExplicitPermissionCollector::new(self.model);
        let policy_deriver = PolicyRefinementDeriver::new(self.model);
        let implicit = ImplicitPermissionDeriver::new(&hierarchy);
        let inherited = InheritedPermissionDeriver::new(&hierarchy);

        let mut diagnostics = Vec::new();
        let mut table = PermissionTable::new();
        let mut delta = PermissionTable::new();
        let mut rounds = 0;
        let mut phase = DrivePhase::Seed;

        while phase != DrivePhase::Done {
            match phase {
                DrivePhase::Seed => {
                    table = collector.collect(resource, &mut diagnostics);
                    debug!(resource = %resource, entries = table.len(), "seeded explicit permissions");

                    // one application copies a single refinement hop, so
                    // reapply until a pass adds nothing; chains then close
                    // regardless of policy registration order
                    let mut seeded = PermissionTable::new();
                    while !policy_deriver.apply(&mut table, &mut seeded).is_empty() {}
                    implicit.apply_full(&actions, &policies, &mut table, &mut seeded)?;
                    inherited.apply_full(&mut table, &mut seeded)?;

                    // the first converging scan walks the whole table so the
                    // cross-hierarchy consequences of the seed passes are
                    // picked up regardless of pass order
                    delta = PermissionTable::new();
                    implicit.apply_full(&actions, &policies, &mut table, &mut delta)?;
                    phase = DrivePhase::Converging;
                }
                DrivePhase::Converging => {
                    if delta.is_empty() {
                        phase = DrivePhase::Done;
                        continue;
                    }
                    rounds += 1;

                    let mut next = PermissionTable::new();
                    let touched = inherited.apply_delta(&mut table, &delta, &mut next)?;
                    debug!(round = rounds, touched = touched.len(), "inherited delta pass");
                    if touched.is_empty() {
                        phase = DrivePhase::Done;
                        continue;
                    }

                    delta = PermissionTable::new();
                    let touched =
                        implicit.apply_delta(&actions, &policies, &mut table, &next, &mut delta)?;
                    debug!(round = rounds, touched = touched.len(), "implicit delta pass");
                }
                DrivePhase::Done => unreachable!("loop exits before entering Done"),
            }
        }

        info!(
            resource = %resource,
            entries = table.len(),
            rounds,
            diagnostics = diagnostics.len(),
            "permission derivation complete"
        );

        Ok(Derivation {
            table,
            diagnostics,
            rounds,
        })
    }
}
