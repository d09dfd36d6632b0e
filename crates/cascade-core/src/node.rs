//! Node entities of the refinement tree.
//!
//! A [`Node`] is a service, a tool, or any deeper specialization of a tool.
//! Nodes are owned by the [`NodeTree`](crate::tree::NodeTree) and refer to
//! each other only through [`NodeKey`] handles.

use std::fmt;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::id::NodeIdentifier;

/// Handle of a node inside a [`NodeTree`](crate::tree::NodeTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKey(pub u32);

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Bridge between NodeKey and petgraph's NodeIndex<u32>.

impl From<NodeIndex<u32>> for NodeKey {
    fn from(idx: NodeIndex<u32>) -> Self {
        NodeKey(idx.index() as u32)
    }
}

impl From<NodeKey> for NodeIndex<u32> {
    fn from(key: NodeKey) -> Self {
        NodeIndex::new(key.0 as usize)
    }
}

/// How subscriptions to a node may be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionMode {
    /// Every mode below is allowed.
    #[default]
    All,
    /// Subscriptions are not allowed.
    None,
    /// Subscriptions create the remote resource.
    Create,
    /// Subscriptions link an existing remote resource.
    Link,
}

impl SubscriptionMode {
    /// All modes, in display order.
    pub const ALL: [SubscriptionMode; 4] = [
        SubscriptionMode::All,
        SubscriptionMode::None,
        SubscriptionMode::Create,
        SubscriptionMode::Link,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionMode::All => "all",
            SubscriptionMode::None => "none",
            SubscriptionMode::Create => "create",
            SubscriptionMode::Link => "link",
        }
    }
}

impl fmt::Display for SubscriptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the refinement tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeIdentifier,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub mode: SubscriptionMode,
}

impl Node {
    pub fn new(id: impl Into<NodeIdentifier>, name: impl Into<String>) -> Self {
        Node {
            id: id.into(),
            name: name.into(),
            description: None,
            mode: SubscriptionMode::All,
        }
    }

    pub fn with_mode(mut self, mode: SubscriptionMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Serialized form of a node in a catalog, parents referenced by identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeIdentifier,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mode: SubscriptionMode,
    #[serde(default)]
    pub refined: Option<NodeIdentifier>,
}

impl NodeRecord {
    /// Splits the record into the node and its parent reference.
    pub fn into_parts(self) -> (Node, Option<NodeIdentifier>) {
        let node = Node {
            id: self.id,
            name: self.name,
            description: self.description,
            mode: self.mode,
        };
        (node, self.refined)
    }
}
