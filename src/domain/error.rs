//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::arena::NodeId;

/// Forest errors are raised before any link is touched, so a failed
/// operation leaves the forest exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForestError {
    #[error("node {0} is out of range or has been removed")]
    OutOfRange(usize),

    #[error("cycle detected: node {new_parent} is {node} or one of its descendants")]
    CycleDetected { node: NodeId, new_parent: NodeId },

    #[error("forest corrupted at node {node}: {reason}")]
    Corrupted { node: NodeId, reason: String },
}

/// Result type for forest operations.
pub type ForestResult<T> = Result<T, ForestError>;
