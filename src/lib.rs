//! # Hierarchical Permission Derivation Engine
//!
//! Computes the complete set of effective permissions implied by explicitly
//! assigned (role, action, policy) grants under three independent partial
//! orders: role inheritance, action composition, and policy refinement. The
//! closure is reached by a monotone fixpoint computation that is sound,
//! complete, deterministic, and terminating on finite acyclic hierarchies.
//!
//! ## Features
//!
//! - **Role inheritance** - a role receives every permission held by the
//!   roles it inherits from, however many hops away
//! - **Action composition** - a grant on a composite action flows to its
//!   parts, and a composite is synthesized once all of its parts are granted
//! - **Policy refinement** - permissions under a refining policy propagate
//!   into the policy it refines
//! - **Provenance tracking** - every derived value records how it entered
//!   the table and which value(s) it came from, for audit and explanation
//! - **Cycle detection** - a cycle in the role or action graph aborts the
//!   run with a typed error instead of diverging
//! - **Deterministic output** - insertion order is preserved end to end, so
//!   identical snapshots produce identical tables and iteration traces
//!
//! ## Example
//!
//! ```rust
//! use derived_permissions::{ExplicitAssignment, FixpointDriver, Grant, MemoryModel};
//!
//! # fn main() -> Result<(), derived_permissions::DeriveError> {
//! let mut model = MemoryModel::new("default");
//! model.add_action("orders", "create_order");
//! // editors inherit everything granted to reviewers
//! model.add_super_role("editor", "reviewer");
//! model.assign(ExplicitAssignment::granted("reviewer", "create_order"));
//!
//! let run = FixpointDriver::new(&model).derive("orders")?;
//!
//! assert_eq!(
//!     run.table.effective("editor", "create_order", "default"),
//!     Some(Grant::Granted)
//! );
//! # Ok(())
//! # }
//! ```
//!
//! The engine is a synchronous in-process core: it consumes a read-only
//! snapshot of the policy graph through the traits in [`model`] and returns
//! an owned [`PermissionTable`]. Runs over different resources are
//! independent and may be parallelized by the caller.

pub mod derive;
pub mod error;
pub mod hierarchy;
pub mod model;
pub mod table;
pub mod types;

// Re-export commonly used types
pub use derive::{
    Derivation, ExplicitPermissionCollector, FixpointDriver, ImplicitBySubactionPredicate,
    ImplicitPermissionDeriver, InheritedPermissionDeriver, PolicyRefinementDeriver,
};
pub use error::{DeriveError, HierarchyKind, Result};
pub use hierarchy::HierarchyResolver;
pub use model::{
    ActionGraph, AssignmentSource, MemoryModel, PolicyGraph, PolicyModel, RoleGraph,
};
pub use table::PermissionTable;
pub use types::{
    Action, ActionId, Diagnostic, ExplicitAssignment, Grant, PermissionRef, PermissionValue,
    Policy, PolicyId, Provenance, Resource, ResourceId, Role, RoleId,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
