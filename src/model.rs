//! Policy-graph collaborator traits and the in-memory snapshot
//!
//! The derivation core never owns the policy graph; it consumes it through
//! four narrow capabilities. [`MemoryModel`] is the bundled implementation
//! used by tests and by callers that assemble a snapshot by hand. A modeling
//! tool with its own object store only has to implement the traits.

use crate::types::{
    Action, ActionId, ExplicitAssignment, Policy, PolicyId, Resource, ResourceId, Role, RoleId,
};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Direct role-inheritance edges.
pub trait RoleGraph {
    /// Roles `role` directly inherits permissions from
    fn direct_super_roles(&self, role: &str) -> IndexSet<RoleId>;

    /// Roles that directly inherit permissions from `role`
    fn direct_sub_roles(&self, role: &str) -> IndexSet<RoleId>;
}

/// Direct action-composition edges and resource ownership.
pub trait ActionGraph {
    /// Composite actions `action` is directly part of
    fn direct_super_actions(&self, action: &str) -> IndexSet<ActionId>;

    /// Actions the composite `action` is directly made of
    fn direct_sub_actions(&self, action: &str) -> IndexSet<ActionId>;

    /// Actions owned by `resource`, in registration order
    fn actions_of(&self, resource: &str) -> Vec<ActionId>;
}

/// Policy refinement edges and the default policy.
pub trait PolicyGraph {
    /// Policies declared to refine `policy`
    fn refined_by(&self, policy: &str) -> IndexSet<PolicyId>;

    /// Policy substituted when an assignment carries none
    fn default_policy(&self) -> PolicyId;

    /// All known policies, in registration order
    fn policies(&self) -> Vec<PolicyId>;
}

/// Raw permission assignments per action.
pub trait AssignmentSource {
    fn assignments_of(&self, action: &str) -> Vec<ExplicitAssignment>;
}

/// Everything the fixpoint driver needs from a policy-graph snapshot.
pub trait PolicyModel: RoleGraph + ActionGraph + PolicyGraph + AssignmentSource {}

impl<T: RoleGraph + ActionGraph + PolicyGraph + AssignmentSource> PolicyModel for T {}

/// In-memory policy-graph snapshot.
///
/// Mutators create missing nodes on demand and keep edge pairs symmetric, so
/// a snapshot assembled in any order ends up consistent. The snapshot is
/// expected to stay unmodified for the duration of a derivation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryModel {
    roles: IndexMap<RoleId, Role>,
    actions: IndexMap<ActionId, Action>,
    policies: IndexMap<PolicyId, Policy>,
    resources: IndexMap<ResourceId, Resource>,
    assignments: IndexMap<ActionId, Vec<ExplicitAssignment>>,
    default_policy: PolicyId,
}

impl MemoryModel {
    /// Create an empty snapshot with the given default policy registered
    pub fn new(default_policy: impl Into<PolicyId>) -> Self {
        let default_policy = default_policy.into();
        let mut policies = IndexMap::new();
        policies.insert(default_policy.clone(), Policy::new(default_policy.clone()));
        Self {
            roles: IndexMap::new(),
            actions: IndexMap::new(),
            policies,
            resources: IndexMap::new(),
            assignments: IndexMap::new(),
            default_policy,
        }
    }

    fn role_entry(&mut self, id: &str) -> &mut Role {
        self.roles
            .entry(id.to_string())
            .or_insert_with(|| Role::new(id))
    }

    fn policy_entry(&mut self, id: &str) -> &mut Policy {
        self.policies
            .entry(id.to_string())
            .or_insert_with(|| Policy::new(id))
    }

    /// Register a role
    pub fn add_role(&mut self, id: &str) {
        self.role_entry(id);
    }

    /// Declare that `role` inherits permissions from `super_role`.
    /// Both roles are created if missing; both edge directions are kept.
    pub fn add_super_role(&mut self, role: &str, super_role: &str) {
        self.role_entry(role).super_roles.insert(super_role.to_string());
        self.role_entry(super_role).sub_roles.insert(role.to_string());
    }

    /// Register a resource
    pub fn add_resource(&mut self, id: &str) {
        self.resources
            .entry(id.to_string())
            .or_insert_with(|| Resource::new(id));
    }

    /// Register an action owned by `resource`
    pub fn add_action(&mut self, resource: &str, action: &str) {
        self.add_resource(resource);
        if let Some(res) = self.resources.get_mut(resource) {
            res.actions.insert(action.to_string());
        }
        self.actions
            .entry(action.to_string())
            .or_insert_with(|| Action::new(action, resource));
    }

    /// Declare that `part` is a sub-action of the composite `composite`.
    /// A missing endpoint is created on the other endpoint's resource.
    pub fn add_sub_action(&mut self, composite: &str, part: &str) {
        let resource = self
            .actions
            .get(composite)
            .or_else(|| self.actions.get(part))
            .map(|a| a.resource.clone())
            .unwrap_or_default();
        for id in [composite, part] {
            if !self.actions.contains_key(id) {
                self.add_action(&resource, id);
            }
        }
        if let Some(action) = self.actions.get_mut(composite) {
            action.sub_actions.insert(part.to_string());
        }
        if let Some(action) = self.actions.get_mut(part) {
            action.super_actions.insert(composite.to_string());
        }
    }

    /// Declare that `action` is part of the composite `super_action`
    pub fn add_super_action(&mut self, action: &str, super_action: &str) {
        self.add_sub_action(super_action, action);
    }

    /// Register a policy
    pub fn add_policy(&mut self, id: &str) {
        self.policy_entry(id);
    }

    /// Declare that `refining` refines `policy`
    pub fn add_refinement(&mut self, policy: &str, refining: &str) {
        self.policy_entry(refining);
        self.policy_entry(policy).refined_by.insert(refining.to_string());
    }

    /// Record a raw permission assignment
    pub fn assign(&mut self, assignment: ExplicitAssignment) {
        self.assignments
            .entry(assignment.action.clone())
            .or_default()
            .push(assignment);
    }
}

impl RoleGraph for MemoryModel {
    fn direct_super_roles(&self, role: &str) -> IndexSet<RoleId> {
        self.roles
            .get(role)
            .map(|r| r.super_roles.clone())
            .unwrap_or_default()
    }

    fn direct_sub_roles(&self, role: &str) -> IndexSet<RoleId> {
        self.roles
            .get(role)
            .map(|r| r.sub_roles.clone())
            .unwrap_or_default()
    }
}

impl ActionGraph for MemoryModel {
    fn direct_super_actions(&self, action: &str) -> IndexSet<ActionId> {
        self.actions
            .get(action)
            .map(|a| a.super_actions.clone())
            .unwrap_or_default()
    }

    fn direct_sub_actions(&self, action: &str) -> IndexSet<ActionId> {
        self.actions
            .get(action)
            .map(|a| a.sub_actions.clone())
            .unwrap_or_default()
    }

    fn actions_of(&self, resource: &str) -> Vec<ActionId> {
        self.resources
            .get(resource)
            .map(|r| r.actions.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl PolicyGraph for MemoryModel {
    fn refined_by(&self, policy: &str) -> IndexSet<PolicyId> {
        self.policies
            .get(policy)
            .map(|p| p.refined_by.clone())
            .unwrap_or_default()
    }

    fn default_policy(&self) -> PolicyId {
        self.default_policy.clone()
    }

    fn policies(&self) -> Vec<PolicyId> {
        self.policies.keys().cloned().collect()
    }
}

impl AssignmentSource for MemoryModel {
    fn assignments_of(&self, action: &str) -> Vec<ExplicitAssignment> {
        self.assignments.get(action).cloned().unwrap_or_default()
    }
}
