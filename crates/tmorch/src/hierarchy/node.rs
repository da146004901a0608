//! Hierarchy node records.

use std::collections::BTreeSet;

use serde::Serialize;
use sonic_tm_device::{Level, NodeDescriptor, NodeId, ProfileId};

use crate::binding::DropColoring;

/// Node add request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeParams {
    /// Node id, unique within the hierarchy.
    pub id: NodeId,
    /// Parent node, `None` to declare the root.
    pub parent: Option<NodeId>,
    /// Strict priority among siblings.
    pub priority: u32,
    /// Weight among siblings of equal priority.
    pub weight: u32,
    /// Requested level. Advisory when a parent is given.
    pub level: Level,
    /// Shaper profile to bind at creation.
    pub shaper_profile: Option<ProfileId>,
}

impl NodeParams {
    /// Creates a root node request.
    pub fn root(id: NodeId) -> Self {
        Self {
            id,
            parent: None,
            priority: 0,
            weight: 1,
            level: Level::ROOT,
            shaper_profile: None,
        }
    }

    /// Creates a request for a node below `parent`.
    pub fn child(id: NodeId, parent: NodeId) -> Self {
        Self {
            id,
            parent: Some(parent),
            priority: 0,
            weight: 1,
            level: Level::ROOT.next(),
            shaper_profile: None,
        }
    }

    /// Sets the scheduling parameters.
    pub fn with_scheduling(mut self, priority: u32, weight: u32) -> Self {
        self.priority = priority;
        self.weight = weight;
        self
    }

    /// Sets the requested level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Binds a shaper profile at creation.
    pub fn with_profile(mut self, profile: ProfileId) -> Self {
        self.shaper_profile = Some(profile);
        self
    }
}

/// Leaf or internal, resolved from the node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeClass {
    /// No children; wired to the transmit queue with the same id.
    Leaf,
    /// Aggregates its children.
    Internal,
}

/// A node of the hierarchy tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmNode {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) level: Level,
    pub(crate) priority: u32,
    pub(crate) weight: u32,
    pub(crate) shaper_profile: Option<ProfileId>,
    pub(crate) children: BTreeSet<NodeId>,
    pub(crate) drop_coloring: DropColoring,
}

impl TmNode {
    pub(crate) fn new(params: &NodeParams, level: Level) -> Self {
        Self {
            id: params.id,
            parent: params.parent,
            level,
            priority: params.priority,
            weight: params.weight,
            shaper_profile: params.shaper_profile,
            children: BTreeSet::new(),
            drop_coloring: DropColoring::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Returns the bound shaper profile.
    pub fn shaper_profile(&self) -> Option<ProfileId> {
        self.shaper_profile
    }

    /// Returns the drop coloring derived from the bound profile.
    pub fn drop_coloring(&self) -> &DropColoring {
        &self.drop_coloring
    }

    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().copied()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn class(&self) -> NodeClass {
        if self.children.is_empty() {
            NodeClass::Leaf
        } else {
            NodeClass::Internal
        }
    }

    /// Returns the record handed to the device.
    pub fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            id: self.id,
            parent: self.parent,
            level: self.level,
            priority: self.priority,
            weight: self.weight,
            shaper_profile: self.shaper_profile,
        }
    }
}
