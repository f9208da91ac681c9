//! Transitive closure queries over the role and action hierarchies
//!
//! Every deriver asks the same closure questions over and over across
//! fixpoint rounds, so results are memoized for the lifetime of the resolver
//! (one derivation run). Traversal is an iterative depth-first walk with an
//! explicit stack and an on-path set: a node met twice on the active path is
//! a cycle and aborts the run with [`DeriveError::CyclicHierarchy`] instead
//! of recursing unboundedly.

use crate::error::{DeriveError, HierarchyKind, Result};
use crate::model::{ActionGraph, RoleGraph};
use crate::types::{ActionId, RoleId};
use dashmap::DashMap;
use indexmap::IndexSet;
use std::collections::HashSet;

/// Memoized deep-closure queries over one policy-graph snapshot.
pub struct HierarchyResolver<'m, M> {
    model: &'m M,
    role_supers: DashMap<RoleId, IndexSet<RoleId>>,
    role_subs: DashMap<RoleId, IndexSet<RoleId>>,
    action_supers: DashMap<ActionId, IndexSet<ActionId>>,
    action_subs: DashMap<ActionId, IndexSet<ActionId>>,
}

impl<'m, M: RoleGraph + ActionGraph> HierarchyResolver<'m, M> {
    pub fn new(model: &'m M) -> Self {
        Self {
            model,
            role_supers: DashMap::new(),
            role_subs: DashMap::new(),
            action_supers: DashMap::new(),
            action_subs: DashMap::new(),
        }
    }

    /// The model snapshot this resolver reads from
    pub fn model(&self) -> &'m M {
        self.model
    }

    /// All direct and indirect super-roles of `role`, excluding `role` itself
    pub fn super_roles_of(&self, role: &str) -> Result<IndexSet<RoleId>> {
        if let Some(hit) = self.role_supers.get(role) {
            return Ok(hit.clone());
        }
        let closure = closure_of(role, HierarchyKind::Role, |id| {
            self.model.direct_super_roles(id)
        })?;
        self.role_supers.insert(role.to_string(), closure.clone());
        Ok(closure)
    }

    /// All direct and indirect sub-roles of `role`, excluding `role` itself
    pub fn sub_roles_of(&self, role: &str) -> Result<IndexSet<RoleId>> {
        if let Some(hit) = self.role_subs.get(role) {
            return Ok(hit.clone());
        }
        let closure = closure_of(role, HierarchyKind::Role, |id| {
            self.model.direct_sub_roles(id)
        })?;
        self.role_subs.insert(role.to_string(), closure.clone());
        Ok(closure)
    }

    /// All direct and indirect super-actions of `action`, excluding itself
    pub fn super_actions_of(&self, action: &str) -> Result<IndexSet<ActionId>> {
        if let Some(hit) = self.action_supers.get(action) {
            return Ok(hit.clone());
        }
        let closure = closure_of(action, HierarchyKind::Action, |id| {
            self.model.direct_super_actions(id)
        })?;
        self.action_supers.insert(action.to_string(), closure.clone());
        Ok(closure)
    }

    /// All direct and indirect sub-actions of `action`, excluding itself
    pub fn sub_actions_of(&self, action: &str) -> Result<IndexSet<ActionId>> {
        if let Some(hit) = self.action_subs.get(action) {
            return Ok(hit.clone());
        }
        let closure = closure_of(action, HierarchyKind::Action, |id| {
            self.model.direct_sub_actions(id)
        })?;
        self.action_subs.insert(action.to_string(), closure.clone());
        Ok(closure)
    }
}

struct Frame {
    node: String,
    children: Vec<String>,
    next: usize,
}

/// Transitive closure of `neighbors` from `start`, excluding `start`.
/// Discovery order is deterministic given deterministic edge order.
fn closure_of<F>(start: &str, kind: HierarchyKind, neighbors: F) -> Result<IndexSet<String>>
where
    F: Fn(&str) -> IndexSet<String>,
{
    let mut result: IndexSet<String> = IndexSet::new();
    let mut on_path: HashSet<String> = HashSet::new();
    let mut stack = vec![Frame {
        children: neighbors(start).into_iter().collect(),
        node: start.to_string(),
        next: 0,
    }];
    on_path.insert(start.to_string());

    while let Some(frame) = stack.last_mut() {
        if frame.next < frame.children.len() {
            let child = frame.children[frame.next].clone();
            frame.next += 1;
            if on_path.contains(&child) {
                return Err(DeriveError::CyclicHierarchy { kind, node: child });
            }
            if result.contains(&child) {
                // finished via another branch
                continue;
            }
            result.insert(child.clone());
            on_path.insert(child.clone());
            stack.push(Frame {
                children: neighbors(&child).into_iter().collect(),
                node: child,
                next: 0,
            });
        } else {
            on_path.remove(&frame.node);
            stack.pop();
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemoryModel;

    fn chain_model() -> MemoryModel {
        // staff <- clerk <- senior_clerk (each inherits from the previous)
        let mut model = MemoryModel::new("default");
        model.add_super_role("clerk", "staff");
        model.add_super_role("senior_clerk", "clerk");
        model.add_action("orders", "manage_order");
        model.add_sub_action("manage_order", "create_order");
        model.add_sub_action("manage_order", "cancel_order");
        model
    }

    #[test]
    fn test_deep_super_role_closure() {
        let model = chain_model();
        let resolver = HierarchyResolver::new(&model);

        let supers = resolver.super_roles_of("senior_clerk").unwrap();
        assert_eq!(supers.len(), 2);
        assert!(supers.contains("clerk"));
        assert!(supers.contains("staff"));
        // the argument itself is never part of the closure
        assert!(!supers.contains("senior_clerk"));

        assert!(resolver.super_roles_of("staff").unwrap().is_empty());
    }

    #[test]
    fn test_deep_sub_role_closure() {
        let model = chain_model();
        let resolver = HierarchyResolver::new(&model);

        let subs = resolver.sub_roles_of("staff").unwrap();
        assert_eq!(subs.len(), 2);
        assert!(subs.contains("clerk"));
        assert!(subs.contains("senior_clerk"));
    }

    #[test]
    fn test_action_closures() {
        let model = chain_model();
        let resolver = HierarchyResolver::new(&model);

        let supers = resolver.super_actions_of("create_order").unwrap();
        assert_eq!(supers.len(), 1);
        assert!(supers.contains("manage_order"));

        let subs = resolver.sub_actions_of("manage_order").unwrap();
        assert_eq!(subs.len(), 2);
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let mut model = MemoryModel::new("default");
        // bottom inherits from left and right, both inherit from top
        model.add_super_role("bottom", "left");
        model.add_super_role("bottom", "right");
        model.add_super_role("left", "top");
        model.add_super_role("right", "top");

        let resolver = HierarchyResolver::new(&model);
        let supers = resolver.super_roles_of("bottom").unwrap();
        assert_eq!(supers.len(), 3);
    }

    #[test]
    fn test_role_cycle_is_detected() {
        let mut model = MemoryModel::new("default");
        model.add_super_role("a", "b");
        model.add_super_role("b", "a");

        let resolver = HierarchyResolver::new(&model);
        let err = resolver.super_roles_of("a").unwrap_err();
        match err {
            DeriveError::CyclicHierarchy { kind, node } => {
                assert_eq!(kind, HierarchyKind::Role);
                assert!(node == "a" || node == "b");
            }
        }
    }

    #[test]
    fn test_self_loop_is_detected() {
        let mut model = MemoryModel::new("default");
        model.add_action("res", "edit");
        model.add_sub_action("edit", "edit");

        let resolver = HierarchyResolver::new(&model);
        let err = resolver.sub_actions_of("edit").unwrap_err();
        assert_eq!(
            err,
            DeriveError::CyclicHierarchy {
                kind: HierarchyKind::Action,
                node: "edit".to_string()
            }
        );
    }

    #[test]
    fn test_memoized_queries_stay_consistent() {
        let model = chain_model();
        let resolver = HierarchyResolver::new(&model);

        let first = resolver.super_roles_of("senior_clerk").unwrap();
        let second = resolver.super_roles_of("senior_clerk").unwrap();
        assert_eq!(first, second);
    }
}
