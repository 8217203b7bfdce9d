//! Error types for tree mutation.

use crate::NodeId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("node {0:?} is not a child of {1:?}")]
    NotAChild(NodeId, NodeId),

    #[error("node {0:?} is already attached to a parent")]
    AlreadyAttached(NodeId),

    #[error("inserting {0:?} under {1:?} would create a cycle")]
    WouldCycle(NodeId, NodeId),

    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0:?} does not carry character data")]
    NotCharacterData(NodeId),
}
