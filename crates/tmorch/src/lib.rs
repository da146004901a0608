//! SONiC tmorch - Traffic Manager hierarchy controller
//!
//! Builds and validates per-port traffic manager hierarchies: trees of
//! scheduling and shaping nodes whose leaves map 1:1 onto the port's
//! transmit queues. Hardware programming is delegated to a
//! [`sonic_tm_device::TmDevice`] implementation.
//!
//! ```text
//! [orchestration] --TmOps--> [TmSystem] --IfIndex--> [TmContext] --TmDevice--> [driver]
//!                                                      |
//!                         registry, tree, defaults, lifecycle, stats
//! ```
//!
//! # Key Components
//!
//! - [`shaper::ShaperRegistry`]: shaper profiles in canonical units
//! - [`hierarchy::HierarchyTree`]: node arena, level derivation, leaf tracking
//! - [`binding::DefaultsEngine`]: shaper binding and drop-coloring defaults
//! - [`lifecycle::LifecycleController`]: Inactive/Active state machine
//! - [`stats::StatsAggregator`]: leaf transmit and internal drop counters
//! - [`context::TmContext`]: per-device facade with audit logging
//! - [`system::TmSystem`]: the [`system::TmOps`] table keyed by interface

pub mod audit;
pub mod binding;
pub mod config;
pub mod context;
pub mod error;
pub mod hierarchy;
pub mod lifecycle;
pub mod shaper;
pub mod stats;
pub mod system;

pub use binding::{DefaultsEngine, DropColoring, DropColoringPolicy, RedAlgorithm};
pub use config::{ConfigError, HierarchyFile, TmOrchConfig};
pub use context::{HierarchySnapshot, TmContext, TmOrchStats};
pub use error::{TmError, TmErrorKind, TmResult};
pub use hierarchy::{HierarchyTree, NodeClass, NodeParams, TmNode};
pub use lifecycle::{ActivationState, LifecycleController};
pub use shaper::{ShaperParams, ShaperRegistry};
pub use stats::{NodeStats, StatsAggregator};
pub use system::{TmOps, TmSystem};
