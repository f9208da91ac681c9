//! Error types for the derivation engine

use std::fmt;
use thiserror::Error;

/// Which hierarchy a cycle was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyKind {
    Role,
    Action,
}

impl fmt::Display for HierarchyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role => write!(f, "role"),
            Self::Action => write!(f, "action"),
        }
    }
}

/// Fatal derivation errors.
///
/// Recoverable conditions (unresolved role references, ambiguous policy
/// attachments) are not errors; they are reported as
/// [`Diagnostic`](crate::types::Diagnostic) values on the run result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeriveError {
    /// A cycle was detected in the role or action hierarchy. The closure
    /// computation cannot guarantee termination, so the whole run is aborted.
    #[error("cycle detected in {kind} hierarchy at '{node}'")]
    CyclicHierarchy {
        /// Hierarchy the cycle belongs to
        kind: HierarchyKind,
        /// The node revisited on the active traversal path
        node: String,
    },
}

/// Result type for derivation operations
pub type Result<T> = std::result::Result<T, DeriveError>;
