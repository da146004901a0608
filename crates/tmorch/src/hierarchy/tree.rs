//! HierarchyTree implementation.

use std::collections::BTreeMap;

use sonic_tm_device::{Level, NodeId, QueueId};

use super::node::{NodeClass, NodeParams, TmNode};
use crate::error::{TmError, TmResult};

/// Arena of hierarchy nodes keyed by id.
///
/// Parent links are ids. Each node also records its children so the leaf
/// count and node classes are available without a scan of the parents.
#[derive(Debug, Clone)]
pub struct HierarchyTree {
    nodes: BTreeMap<NodeId, TmNode>,
    root: Option<NodeId>,
    max_nodes: usize,
}

impl HierarchyTree {
    /// Creates an empty tree holding at most `max_nodes` nodes.
    pub fn new(max_nodes: usize) -> Self {
        Self {
            nodes: BTreeMap::new(),
            root: None,
            max_nodes,
        }
    }

    /// Validates a node add request and builds the node record.
    ///
    /// The tree is not modified. The effective level is the parent's level
    /// plus one; a node without a parent becomes the root at
    /// [`Level::ROOT`].
    pub fn plan_node(&self, params: &NodeParams) -> TmResult<TmNode> {
        if !params.id.is_valid() {
            return Err(TmError::invalid_argument(
                "node_id",
                "reserved invalid id cannot name a node",
            ));
        }
        if self.nodes.contains_key(&params.id) {
            return Err(TmError::already_exists(format!("node {}", params.id)));
        }

        let level = match params.parent {
            Some(parent_id) if parent_id.is_valid() => {
                let parent = self
                    .nodes
                    .get(&parent_id)
                    .ok_or_else(|| TmError::not_found(format!("parent node {}", parent_id)))?;
                if params.level.is_root() {
                    return Err(TmError::invalid_parent(
                        params.id.as_raw(),
                        format!("root level requested under parent {}", parent_id),
                    ));
                }
                parent.level.next()
            }
            Some(_) => {
                return Err(TmError::invalid_parent(
                    params.id.as_raw(),
                    "parent is the reserved invalid id",
                ));
            }
            None => {
                if let Some(root) = self.root {
                    return Err(TmError::already_exists(format!("root node (node {})", root)));
                }
                Level::ROOT
            }
        };

        if self.nodes.len() >= self.max_nodes {
            return Err(TmError::allocation(
                "tm node",
                format!("hierarchy full ({} nodes)", self.max_nodes),
            ));
        }

        Ok(TmNode::new(params, level))
    }

    /// Inserts a node built by [`plan_node`](Self::plan_node) and links it
    /// to its parent.
    pub fn insert(&mut self, node: TmNode) {
        match node.parent {
            Some(parent) => {
                if let Some(parent) = self.nodes.get_mut(&parent) {
                    parent.children.insert(node.id);
                }
            }
            None => self.root = Some(node.id),
        }
        self.nodes.insert(node.id, node);
    }

    /// Removes a node and unlinks it from its parent.
    pub fn remove(&mut self, id: NodeId) -> Option<TmNode> {
        let node = self.nodes.remove(&id)?;
        match node.parent {
            Some(parent) => {
                if let Some(parent) = self.nodes.get_mut(&parent) {
                    parent.children.remove(&id);
                }
            }
            None => self.root = None,
        }
        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&TmNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut TmNode> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Returns the root node id.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Returns true if the node exists and has no children.
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.class_of(id) == Some(NodeClass::Leaf)
    }

    /// Returns the class of a node, `None` if it does not exist.
    pub fn class_of(&self, id: NodeId) -> Option<NodeClass> {
        self.nodes.get(&id).map(TmNode::class)
    }

    /// Returns the number of childless nodes.
    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Returns the transmit queue wired to a leaf.
    ///
    /// Leaves take queues in id order: the lowest leaf id gets queue 0.
    /// `None` for internal and unknown nodes.
    pub fn queue_of(&self, id: NodeId) -> Option<QueueId> {
        if !self.is_leaf(id) {
            return None;
        }
        let index = self
            .leaves()
            .take_while(|leaf| leaf.id != id)
            .count();
        u32::try_from(index).ok().map(QueueId::new)
    }

    fn leaves(&self) -> impl Iterator<Item = &TmNode> {
        self.nodes.values().filter(|node| node.children.is_empty())
    }

    /// Iterates over the nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &TmNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
