//! Permission table: (role, action, policy) -> set of permission values
//!
//! The table is the single mutable state of a derivation run. It only ever
//! grows: inserting a value equal to one already present (same grant and
//! provenance) is a no-op, which is what makes the fixpoint monotone.
//! Insertion order of roles, actions and policies is preserved so runs over
//! the same snapshot produce identical, reproducible iteration traces.

use crate::types::{ActionId, Grant, PermissionValue, PolicyId, Provenance, RoleId};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

type PolicyValues = IndexMap<PolicyId, IndexSet<PermissionValue>>;
type ActionValues = IndexMap<ActionId, PolicyValues>;

/// Derived-permission store for one run.
///
/// Equality compares key/value-set contents and is insensitive to insertion
/// order, so two runs over the same snapshot compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionTable {
    entries: IndexMap<RoleId, ActionValues>,
}

impl PermissionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value at (role, action, policy).
    ///
    /// Returns `true` if the value was newly added, `false` if an equal
    /// (grant, provenance) pair was already present.
    pub fn insert(
        &mut self,
        role: &str,
        action: &str,
        policy: &str,
        value: PermissionValue,
    ) -> bool {
        self.entries
            .entry(role.to_string())
            .or_default()
            .entry(action.to_string())
            .or_default()
            .entry(policy.to_string())
            .or_default()
            .insert(value)
    }

    /// Values recorded at (role, action, policy), if any
    pub fn values(&self, role: &str, action: &str, policy: &str) -> Option<&IndexSet<PermissionValue>> {
        self.entries
            .get(role)
            .and_then(|actions| actions.get(action))
            .and_then(|policies| policies.get(policy))
    }

    /// Iterate the values recorded at (role, action, policy)
    pub fn query(
        &self,
        role: &str,
        action: &str,
        policy: &str,
    ) -> impl Iterator<Item = &PermissionValue> {
        self.values(role, action, policy).into_iter().flatten()
    }

    /// True if a positive grant of any provenance exists at the key
    pub fn has_positive(&self, role: &str, action: &str, policy: &str) -> bool {
        self.query(role, action, policy).any(|v| v.is_positive())
    }

    /// Single effective grant decision for a key.
    ///
    /// Conflict-resolution rule: explicit values take precedence over derived
    /// ones; within the same precedence class a deny wins. Returns `None`
    /// when no value is recorded at all.
    pub fn effective(&self, role: &str, action: &str, policy: &str) -> Option<Grant> {
        let values = self.values(role, action, policy)?;
        if values.is_empty() {
            return None;
        }
        let any_explicit = values.iter().any(|v| v.provenance == Provenance::Explicit);
        let denied = values
            .iter()
            .filter(|v| !any_explicit || v.provenance == Provenance::Explicit)
            .any(|v| v.grant == Grant::Denied);
        Some(if denied { Grant::Denied } else { Grant::Granted })
    }

    /// Roles present in the table, in first-insertion order
    pub fn roles(&self) -> impl Iterator<Item = &RoleId> {
        self.entries.keys()
    }

    /// True if the role holds at least one value
    pub fn contains_role(&self, role: &str) -> bool {
        self.entries.contains_key(role)
    }

    /// Iterate every (action, policy, value) recorded under a role
    pub fn iter_role(
        &self,
        role: &str,
    ) -> impl Iterator<Item = (&ActionId, &PolicyId, &PermissionValue)> {
        self.entries
            .get(role)
            .into_iter()
            .flat_map(|actions| actions.iter())
            .flat_map(|(action, policies)| {
                policies.iter().flat_map(move |(policy, values)| {
                    values.iter().map(move |value| (action, policy, value))
                })
            })
    }

    /// Iterate every (role, action, policy, value) entry
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&RoleId, &ActionId, &PolicyId, &PermissionValue)> {
        self.entries.iter().flat_map(|(role, actions)| {
            actions.iter().flat_map(move |(action, policies)| {
                policies.iter().flat_map(move |(policy, values)| {
                    values.iter().map(move |value| (role, action, policy, value))
                })
            })
        })
    }

    /// Total number of recorded values
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// True if no value is recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PermissionRef;

    #[test]
    fn test_insert_is_idempotent() {
        let mut table = PermissionTable::new();
        assert!(table.insert("clerk", "edit", "default", PermissionValue::explicit(Grant::Granted)));
        // same (grant, provenance), richer origin: still a no-op
        let duplicate = PermissionValue {
            origin: vec![PermissionRef::new("x", "y", "z")],
            ..PermissionValue::explicit(Grant::Granted)
        };
        assert!(!table.insert("clerk", "edit", "default", duplicate));
        assert_eq!(table.len(), 1);

        // a different grant is a distinct value at the same key
        assert!(table.insert("clerk", "edit", "default", PermissionValue::explicit(Grant::Denied)));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_roles_preserve_insertion_order() {
        let mut table = PermissionTable::new();
        table.insert("zeta", "a", "p", PermissionValue::explicit(Grant::Granted));
        table.insert("alpha", "a", "p", PermissionValue::explicit(Grant::Granted));
        table.insert("zeta", "b", "p", PermissionValue::explicit(Grant::Granted));

        let roles: Vec<_> = table.roles().cloned().collect();
        assert_eq!(roles, vec!["zeta".to_string(), "alpha".to_string()]);
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let mut a = PermissionTable::new();
        a.insert("r1", "a", "p", PermissionValue::explicit(Grant::Granted));
        a.insert("r2", "a", "p", PermissionValue::explicit(Grant::Denied));

        let mut b = PermissionTable::new();
        b.insert("r2", "a", "p", PermissionValue::explicit(Grant::Denied));
        b.insert("r1", "a", "p", PermissionValue::explicit(Grant::Granted));

        assert_eq!(a, b);
    }

    #[test]
    fn test_query_and_has_positive() {
        let mut table = PermissionTable::new();
        table.insert("clerk", "edit", "default", PermissionValue::explicit(Grant::Denied));
        assert!(!table.has_positive("clerk", "edit", "default"));
        assert_eq!(table.query("clerk", "edit", "default").count(), 1);
        assert_eq!(table.query("clerk", "edit", "other").count(), 0);

        table.insert("clerk", "edit", "default", PermissionValue::composite(Vec::new()));
        assert!(table.has_positive("clerk", "edit", "default"));
    }

    #[test]
    fn test_effective_prefers_explicit_and_denies() {
        let mut table = PermissionTable::new();
        assert_eq!(table.effective("clerk", "edit", "default"), None);

        // derived grant only
        let source = PermissionValue::explicit(Grant::Granted);
        table.insert(
            "clerk",
            "edit",
            "default",
            PermissionValue::inherited(&source, PermissionRef::new("admin", "edit", "default")),
        );
        assert_eq!(table.effective("clerk", "edit", "default"), Some(Grant::Granted));

        // a derived deny at the same rank wins
        let deny = PermissionValue::explicit(Grant::Denied);
        table.insert(
            "clerk",
            "edit",
            "default",
            PermissionValue::implicit_super(&deny, PermissionRef::new("clerk", "manage", "default")),
        );
        assert_eq!(table.effective("clerk", "edit", "default"), Some(Grant::Denied));

        // an explicit grant outranks every derived value
        table.insert("clerk", "edit", "default", PermissionValue::explicit(Grant::Granted));
        assert_eq!(table.effective("clerk", "edit", "default"), Some(Grant::Granted));

        // an explicit deny beats an explicit grant
        table.insert("clerk", "edit", "default", PermissionValue::explicit(Grant::Denied));
        assert_eq!(table.effective("clerk", "edit", "default"), Some(Grant::Denied));
    }

    #[test]
    fn test_iter_role_covers_all_entries() {
        let mut table = PermissionTable::new();
        table.insert("clerk", "edit", "default", PermissionValue::explicit(Grant::Granted));
        table.insert("clerk", "view", "strict", PermissionValue::explicit(Grant::Granted));
        table.insert("admin", "view", "strict", PermissionValue::explicit(Grant::Granted));

        assert_eq!(table.iter_role("clerk").count(), 2);
        assert_eq!(table.iter_role("ghost").count(), 0);
        assert_eq!(table.iter().count(), 3);
    }
}
