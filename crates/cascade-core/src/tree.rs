//! NodeTree: the refinement hierarchy and its service/tool root cache.
//!
//! Nodes live in a petgraph `StableGraph`; a refinement is an edge from the
//! specialized node to the node it refines, so the tree owns every node and
//! `refined` is a plain handle lookup. Each node slot carries two
//! once-computed cells holding its resolved service root and tool root.
//!
//! Resolution walks the chain with a visited set. A revisited node fails
//! with [`CoreError::CycleDetected`] and nothing gets cached. A successful
//! walk caches its result on every node of the walked path. Once any root
//! has been cached the chain is frozen and [`NodeTree::refine`] refuses
//! further changes, so cached roots never go stale. A failed walk leaves
//! the tree open, so a cycle can still be repaired.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;

use indexmap::IndexMap;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use tracing::debug;

use crate::error::CoreError;
use crate::id::NodeIdentifier;
use crate::node::{Node, NodeKey, NodeRecord, SubscriptionMode};

/// Edge weight: the source node refines the target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refines;

#[derive(Debug)]
struct NodeSlot {
    node: Node,
    service: OnceLock<NodeKey>,
    tool: OnceLock<Option<NodeKey>>,
}

impl NodeSlot {
    fn new(node: Node) -> Self {
        NodeSlot {
            node,
            service: OnceLock::new(),
            tool: OnceLock::new(),
        }
    }
}

/// Owner of every node of a session and of their refinement links.
#[derive(Debug, Default)]
pub struct NodeTree {
    graph: StableGraph<NodeSlot, Refines, Directed, u32>,
    index: IndexMap<NodeIdentifier, NodeKey>,
    walks: AtomicU64,
    frozen: AtomicBool,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from catalog records. Parents may appear after their
    /// children.
    pub fn from_records(records: impl IntoIterator<Item = NodeRecord>) -> Result<Self, CoreError> {
        let mut tree = NodeTree::new();
        let mut links = Vec::new();
        for record in records {
            let (node, refined) = record.into_parts();
            let key = tree.insert(node, None)?;
            if let Some(parent) = refined {
                links.push((key, parent));
            }
        }
        for (child, parent) in links {
            let parent = tree
                .key_of(&parent)
                .ok_or(CoreError::UnknownNode { id: parent })?;
            tree.refine(child, parent)?;
        }
        Ok(tree)
    }

    /// Adds a node, optionally refining an existing one.
    pub fn insert(&mut self, node: Node, refined: Option<NodeKey>) -> Result<NodeKey, CoreError> {
        if self.index.contains_key(&node.id) {
            return Err(CoreError::DuplicateNode { id: node.id });
        }
        if let Some(parent) = refined {
            self.slot(parent)?;
        }
        let id = node.id.clone();
        let key = NodeKey::from(self.graph.add_node(NodeSlot::new(node)));
        self.index.insert(id, key);
        if let Some(parent) = refined {
            self.graph.add_edge(key.into(), parent.into(), Refines);
        }
        Ok(key)
    }

    /// Sets `child` as a refinement of `parent`, replacing any previous link.
    ///
    /// Rejected once a root has been cached anywhere in the tree.
    pub fn refine(&mut self, child: NodeKey, parent: NodeKey) -> Result<(), CoreError> {
        let child_id = self.slot(child)?.node.id.clone();
        self.slot(parent)?;
        if child == parent {
            return Err(CoreError::SelfRefinement { id: child_id });
        }
        if self.frozen.load(Ordering::Acquire) {
            return Err(CoreError::RefinementFrozen { id: child_id });
        }
        let previous: Vec<_> = self
            .graph
            .edges_directed(child.into(), Direction::Outgoing)
            .map(|edge| edge.id())
            .collect();
        for edge in previous {
            self.graph.remove_edge(edge);
        }
        self.graph.add_edge(child.into(), parent.into(), Refines);
        Ok(())
    }

    fn slot(&self, key: NodeKey) -> Result<&NodeSlot, CoreError> {
        self.graph
            .node_weight(key.into())
            .ok_or(CoreError::NodeNotFound { key })
    }

    pub fn get(&self, key: NodeKey) -> Result<&Node, CoreError> {
        self.slot(key).map(|slot| &slot.node)
    }

    pub fn key_of(&self, id: &NodeIdentifier) -> Option<NodeKey> {
        self.index.get(id).copied()
    }

    /// The node `key` refines, if any.
    pub fn refined(&self, key: NodeKey) -> Option<NodeKey> {
        if !self.graph.contains_node(key.into()) {
            return None;
        }
        self.graph
            .neighbors_directed(key.into(), Direction::Outgoing)
            .next()
            .map(NodeKey::from)
    }

    /// Nodes directly refining `key`, in insertion order.
    pub fn children(&self, key: NodeKey) -> Vec<NodeKey> {
        if !self.graph.contains_node(key.into()) {
            return Vec::new();
        }
        let mut children: Vec<NodeKey> = self
            .graph
            .neighbors_directed(key.into(), Direction::Incoming)
            .map(NodeKey::from)
            .collect();
        children.sort_by_key(|k| k.0);
        children
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterates all nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &Node)> + '_ {
        self.index
            .values()
            .filter_map(|&key| self.get(key).ok().map(|node| (key, node)))
    }

    /// Number of chain walks performed so far. Cache hits do not walk.
    pub fn walk_count(&self) -> u64 {
        self.walks.load(Ordering::Relaxed)
    }

    /// Whether the whole refinement graph is free of cycles.
    pub fn is_acyclic(&self) -> bool {
        !petgraph::algo::is_cyclic_directed(&self.graph)
    }

    fn begin_walk(&self) {
        self.walks.fetch_add(1, Ordering::Relaxed);
    }

    fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    fn cycle_at(&self, key: NodeKey) -> CoreError {
        match self.slot(key) {
            Ok(slot) => CoreError::CycleDetected {
                id: slot.node.id.clone(),
            },
            Err(err) => err,
        }
    }

    /// Returns the root of the refinement chain of `key`: the basic service.
    ///
    /// A node without parent is its own service root.
    pub fn resolve_service_root(&self, key: NodeKey) -> Result<NodeKey, CoreError> {
        let slot = self.slot(key)?;
        if let Some(&root) = slot.service.get() {
            debug!(node = %slot.node.id, "service root cache hit");
            return Ok(root);
        }

        self.begin_walk();
        let mut path = vec![key];
        let mut visited = HashSet::from([key]);
        let mut current = key;
        let root = loop {
            let Some(parent) = self.refined(current) else {
                break current;
            };
            if let Some(&cached) = self.slot(parent)?.service.get() {
                break cached;
            }
            if !visited.insert(parent) {
                return Err(self.cycle_at(parent));
            }
            path.push(parent);
            current = parent;
        };

        for step in path {
            let _ = self.slot(step)?.service.set(root);
        }
        self.freeze();
        debug!(node = %slot.node.id, root = %root, "service root resolved");
        Ok(root)
    }

    /// Returns the first refinement level below the service root: the tool.
    ///
    /// A node without parent is a bare service and has no tool root.
    pub fn resolve_tool_root(&self, key: NodeKey) -> Result<Option<NodeKey>, CoreError> {
        let slot = self.slot(key)?;
        if let Some(&tool) = slot.tool.get() {
            debug!(node = %slot.node.id, "tool root cache hit");
            return Ok(tool);
        }

        self.begin_walk();
        let Some(mut parent) = self.refined(key) else {
            let _ = slot.tool.set(None);
            self.freeze();
            return Ok(None);
        };

        let mut path = vec![key];
        let mut visited = HashSet::from([key]);
        let mut current = key;
        let tool = loop {
            let Some(grand) = self.refined(parent) else {
                break Some(current);
            };
            // `parent` has a parent of its own, so its tool root is ours.
            if let Some(&cached) = self.slot(parent)?.tool.get() {
                break cached;
            }
            if !visited.insert(parent) {
                return Err(self.cycle_at(parent));
            }
            path.push(parent);
            current = parent;
            parent = grand;
        };

        for step in path {
            let _ = self.slot(step)?.tool.set(tool);
        }
        self.freeze();
        debug!(node = %slot.node.id, "tool root resolved");
        Ok(tool)
    }

    /// Service root of the node registered under `id`.
    pub fn service_of(&self, id: &NodeIdentifier) -> Result<&Node, CoreError> {
        let key = self
            .key_of(id)
            .ok_or_else(|| CoreError::UnknownNode { id: id.clone() })?;
        self.get(self.resolve_service_root(key)?)
    }

    /// Tool root of the node registered under `id`, `None` for a service.
    pub fn tool_of(&self, id: &NodeIdentifier) -> Result<Option<&Node>, CoreError> {
        let key = self
            .key_of(id)
            .ok_or_else(|| CoreError::UnknownNode { id: id.clone() })?;
        match self.resolve_tool_root(key)? {
            Some(tool) => self.get(tool).map(Some),
            None => Ok(None),
        }
    }

    /// Subscription modes a node refining `key` may use.
    ///
    /// A parent restricted to one mode imposes it on its refinements.
    pub fn available_modes(&self, key: NodeKey) -> Result<Vec<SubscriptionMode>, CoreError> {
        let node = self.get(key)?;
        match node.mode {
            SubscriptionMode::All => Ok(SubscriptionMode::ALL.to_vec()),
            mode => Ok(vec![mode]),
        }
    }
}
