//! Scheduling hierarchy.
//!
//! A per-device tree of scheduling and shaping nodes rooted at a single
//! root node. Levels are derived from the parent at insertion time, and a
//! node is a leaf exactly when it has no children.

mod node;
mod tree;

pub use node::{NodeClass, NodeParams, TmNode};
pub use tree::HierarchyTree;
