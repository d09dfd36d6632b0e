//! Core error types for cascade-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! identifier parsing and the refinement tree.

use thiserror::Error;

use crate::id::NodeIdentifier;
use crate::node::NodeKey;

/// Core errors produced by the cascade-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The identifier has fewer segments than the operation requires.
    #[error("malformed node identifier '{id}': {required} segments required, {found} found")]
    MalformedId {
        id: NodeIdentifier,
        required: usize,
        found: usize,
    },

    /// Walking the refinement chain revisited a node.
    #[error("refinement cycle detected at node '{id}'")]
    CycleDetected { id: NodeIdentifier },

    /// A node handle does not belong to the tree.
    #[error("node not found: NodeKey({key})", key = key.0)]
    NodeNotFound { key: NodeKey },

    /// A record references a node identifier that is not in the catalog.
    #[error("unknown node: '{id}'")]
    UnknownNode { id: NodeIdentifier },

    /// A node with the same identifier is already registered.
    #[error("duplicate node: '{id}'")]
    DuplicateNode { id: NodeIdentifier },

    /// The node's roots were already resolved, its chain can no longer change.
    #[error("refinement of '{id}' is frozen: roots already resolved")]
    RefinementFrozen { id: NodeIdentifier },

    /// A node cannot refine itself.
    #[error("node '{id}' cannot refine itself")]
    SelfRefinement { id: NodeIdentifier },
}
