//! Error types for the page model

use crate::document::NodeId;

/// Document and storage errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Node handle is dangling
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Operation requires an element
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    /// No attached element carries this id
    #[error("no element with id '{0}'")]
    ElementIdNotFound(String),

    /// Insertion would create a cycle or move the root
    #[error("cannot insert {child} under {parent}")]
    HierarchyViolation {
        /// Intended parent
        parent: NodeId,
        /// Node being inserted
        child: NodeId,
    },

    /// Reference node is not a child of the parent
    #[error("{child} is not a child of {parent}")]
    NotAChild {
        /// Parent node
        parent: NodeId,
        /// Expected child
        child: NodeId,
    },

    /// Node has no parent
    #[error("node {0} is detached")]
    Detached(NodeId),

    /// `html`, `head` and `body` cannot be removed
    #[error("node {0} cannot be removed")]
    PermanentNode(NodeId),

    /// Storage value could not be (de)serialized
    #[error("storage key '{key}': {reason}")]
    Storage {
        /// Storage key
        key: String,
        /// Underlying failure
        reason: String,
    },
}
