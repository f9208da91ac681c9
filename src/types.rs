//! Core model and permission value types

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Unique role identifier
pub type RoleId = String;

/// Unique action identifier
pub type ActionId = String;

/// Unique policy identifier
pub type PolicyId = String;

/// Unique resource identifier
pub type ResourceId = String;

/// Role node: identity plus direct inheritance edges.
///
/// `super_roles` are the roles this role inherits permissions from;
/// `sub_roles` is the inverse relation. Both directions are kept so closure
/// queries can walk the hierarchy either way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,

    /// Roles this role inherits permissions from
    #[serde(default)]
    pub super_roles: IndexSet<RoleId>,

    /// Roles that inherit permissions from this role
    #[serde(default)]
    pub sub_roles: IndexSet<RoleId>,
}

impl Role {
    /// Create a new role; the name defaults to the id
    pub fn new(id: impl Into<RoleId>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            super_roles: IndexSet::new(),
            sub_roles: IndexSet::new(),
        }
    }
}

/// Action node: identity, owning resource, and composition edges.
///
/// `super_actions` are the composite actions this action is part of;
/// `sub_actions` are the actions a composite is made of.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub name: String,

    /// Resource this action belongs to
    pub resource: ResourceId,

    /// Composite actions this action is part of
    #[serde(default)]
    pub super_actions: IndexSet<ActionId>,

    /// Actions this composite action is made of
    #[serde(default)]
    pub sub_actions: IndexSet<ActionId>,
}

impl Action {
    /// Create a new action on a resource; the name defaults to the id
    pub fn new(id: impl Into<ActionId>, resource: impl Into<ResourceId>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            resource: resource.into(),
            super_actions: IndexSet::new(),
            sub_actions: IndexSet::new(),
        }
    }
}

/// Policy node: identity plus the policies that refine it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub name: String,

    /// Policies declared to refine this policy
    #[serde(default)]
    pub refined_by: IndexSet<PolicyId>,
}

impl Policy {
    /// Create a new policy; the name defaults to the id
    pub fn new(id: impl Into<PolicyId>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            refined_by: IndexSet::new(),
        }
    }
}

/// Resource node: identity plus the actions it owns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,

    /// Actions owned by this resource, in registration order
    #[serde(default)]
    pub actions: IndexSet<ActionId>,
}

impl Resource {
    pub fn new(id: impl Into<ResourceId>) -> Self {
        Self {
            id: id.into(),
            actions: IndexSet::new(),
        }
    }
}

/// Grant decision carried by a permission value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grant {
    Granted,
    Denied,
}

impl Grant {
    /// True for a positive grant
    pub fn is_positive(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// How a permission value entered the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// Directly assigned
    Explicit,
    /// Copied from a super-role
    Inherited,
    /// Copied from a super-action
    ImplicitSuper,
    /// Synthesized because every sub-action is permitted
    ImplicitSub,
    /// Copied from a refining policy
    InheritedPolicy,
}

/// Reference to a (role, action, policy) table key, used in origin chains.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionRef {
    pub role: RoleId,
    pub action: ActionId,
    pub policy: PolicyId,
}

impl PermissionRef {
    pub fn new(
        role: impl Into<RoleId>,
        action: impl Into<ActionId>,
        policy: impl Into<PolicyId>,
    ) -> Self {
        Self {
            role: role.into(),
            action: action.into(),
            policy: policy.into(),
        }
    }
}

/// A single permission value: grant decision, provenance tag, and the table
/// key(s) it was derived from.
///
/// Equality and hashing cover only `(grant, provenance)`: re-adding an equal
/// pair to the same table key is a no-op regardless of its origin chain, which
/// is what keeps the fixpoint monotone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionValue {
    pub grant: Grant,
    pub provenance: Provenance,

    /// Keys of the value(s) this one was copied or synthesized from.
    /// Empty for explicit values.
    #[serde(default)]
    pub origin: Vec<PermissionRef>,
}

impl PermissionValue {
    /// A directly assigned value
    pub fn explicit(grant: Grant) -> Self {
        Self {
            grant,
            provenance: Provenance::Explicit,
            origin: Vec::new(),
        }
    }

    /// A value copied from a super-role
    pub fn inherited(source: &PermissionValue, from: PermissionRef) -> Self {
        Self {
            grant: source.grant,
            provenance: Provenance::Inherited,
            origin: vec![from],
        }
    }

    /// A value copied from a super-action
    pub fn implicit_super(source: &PermissionValue, from: PermissionRef) -> Self {
        Self {
            grant: source.grant,
            provenance: Provenance::ImplicitSuper,
            origin: vec![from],
        }
    }

    /// A value copied from a refining policy
    pub fn inherited_policy(source: &PermissionValue, from: PermissionRef) -> Self {
        Self {
            grant: source.grant,
            provenance: Provenance::InheritedPolicy,
            origin: vec![from],
        }
    }

    /// A positive value synthesized from a fully permitted set of sub-actions
    pub fn composite(origin: Vec<PermissionRef>) -> Self {
        Self {
            grant: Grant::Granted,
            provenance: Provenance::ImplicitSub,
            origin,
        }
    }

    /// True if this value carries a positive grant
    pub fn is_positive(&self) -> bool {
        self.grant.is_positive()
    }
}

impl PartialEq for PermissionValue {
    fn eq(&self, other: &Self) -> bool {
        self.grant == other.grant && self.provenance == other.provenance
    }
}

impl Eq for PermissionValue {}

impl Hash for PermissionValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.grant.hash(state);
        self.provenance.hash(state);
    }
}

/// Raw permission assignment: (action, role, policies, grant).
///
/// The role reference is optional because the upstream model may hold dangling
/// references; an assignment without a resolvable role is skipped with a
/// diagnostic. Zero attached policies means the default policy applies; more
/// than one is ambiguous and the first wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitAssignment {
    pub action: ActionId,
    pub role: Option<RoleId>,
    #[serde(default)]
    pub policies: Vec<PolicyId>,
    pub grant: Grant,
}

impl ExplicitAssignment {
    /// A positive assignment of `action` to `role`
    pub fn granted(role: impl Into<RoleId>, action: impl Into<ActionId>) -> Self {
        Self {
            action: action.into(),
            role: Some(role.into()),
            policies: Vec::new(),
            grant: Grant::Granted,
        }
    }

    /// A negative assignment of `action` to `role`
    pub fn denied(role: impl Into<RoleId>, action: impl Into<ActionId>) -> Self {
        Self {
            action: action.into(),
            role: Some(role.into()),
            policies: Vec::new(),
            grant: Grant::Denied,
        }
    }

    /// An assignment whose role reference could not be resolved
    pub fn unresolved(action: impl Into<ActionId>) -> Self {
        Self {
            action: action.into(),
            role: None,
            policies: Vec::new(),
            grant: Grant::Granted,
        }
    }

    /// Attach a policy to the assignment
    pub fn with_policy(mut self, policy: impl Into<PolicyId>) -> Self {
        self.policies.push(policy.into());
        self
    }
}

/// Recoverable conditions recorded during a derivation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// An explicit assignment referenced a role that could not be resolved;
    /// the assignment was skipped.
    UnresolvedRole { action: ActionId },

    /// An explicit assignment carried more than one policy; the first was
    /// taken and the rest were discarded.
    AmbiguousPolicy {
        role: RoleId,
        action: ActionId,
        chosen: PolicyId,
        ignored: Vec<PolicyId>,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedRole { action } => {
                write!(f, "unresolved role reference on assignment for action '{}'", action)
            }
            Self::AmbiguousPolicy {
                role,
                action,
                chosen,
                ignored,
            } => write!(
                f,
                "multiple policies on assignment ({}, {}): took '{}', ignored {:?}",
                role, action, chosen, ignored
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_positivity() {
        assert!(Grant::Granted.is_positive());
        assert!(!Grant::Denied.is_positive());
        assert!(PermissionValue::explicit(Grant::Granted).is_positive());
        assert!(!PermissionValue::explicit(Grant::Denied).is_positive());
    }

    #[test]
    fn test_value_equality_ignores_origin() {
        let a = PermissionValue::explicit(Grant::Granted);
        let source = PermissionValue::explicit(Grant::Granted);
        let b = PermissionValue {
            origin: vec![PermissionRef::new("admin", "edit", "default")],
            ..PermissionValue::explicit(Grant::Granted)
        };
        assert_eq!(a, b);

        let inherited = PermissionValue::inherited(&source, PermissionRef::new("a", "b", "c"));
        assert_ne!(a, inherited);
        assert_ne!(a, PermissionValue::explicit(Grant::Denied));
    }

    #[test]
    fn test_derived_values_copy_the_grant() {
        let deny = PermissionValue::explicit(Grant::Denied);
        let from = PermissionRef::new("admin", "edit", "default");
        assert_eq!(PermissionValue::inherited(&deny, from.clone()).grant, Grant::Denied);
        assert_eq!(
            PermissionValue::implicit_super(&deny, from.clone()).grant,
            Grant::Denied
        );
        assert_eq!(
            PermissionValue::inherited_policy(&deny, from).grant,
            Grant::Denied
        );
        // a composite is always positive
        assert_eq!(PermissionValue::composite(Vec::new()).grant, Grant::Granted);
    }

    #[test]
    fn test_assignment_builder() {
        let assignment = ExplicitAssignment::granted("clerk", "create_order")
            .with_policy("strict")
            .with_policy("loose");
        assert_eq!(assignment.role.as_deref(), Some("clerk"));
        assert_eq!(assignment.policies, vec!["strict".to_string(), "loose".to_string()]);

        let dangling = ExplicitAssignment::unresolved("create_order");
        assert!(dangling.role.is_none());
    }
}
