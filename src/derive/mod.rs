//! Permission derivation passes and the fixpoint driver
//!
//! One derivation run seeds a [`PermissionTable`](crate::table::PermissionTable)
//! from explicit assignments, then closes it under three independent rules:
//! policy refinement, action composition, and role inheritance. The
//! [`FixpointDriver`] repeats the role/action passes on last-round deltas
//! until a pass adds nothing.

mod driver;
mod explicit;
mod implicit;
mod inherited;
mod policy;

pub use driver::{Derivation, FixpointDriver};
pub use explicit::ExplicitPermissionCollector;
pub use implicit::{ImplicitBySubactionPredicate, ImplicitPermissionDeriver};
pub use inherited::InheritedPermissionDeriver;
pub use policy::PolicyRefinementDeriver;

use crate::table::PermissionTable;
use crate::types::{PermissionValue, RoleId};
use indexmap::IndexSet;

/// Insert `value` into `table`; on a genuinely new value, mirror it into the
/// `next` delta table and mark the role as touched.
pub(crate) fn record(
    table: &mut PermissionTable,
    next: &mut PermissionTable,
    touched: &mut IndexSet<RoleId>,
    role: &str,
    action: &str,
    policy: &str,
    value: PermissionValue,
) {
    if table.insert(role, action, policy, value.clone()) {
        next.insert(role, action, policy, value);
        touched.insert(role.to_string());
    }
}
