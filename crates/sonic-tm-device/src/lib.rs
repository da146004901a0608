//! Device-capability boundary for the SONiC traffic manager.
//!
//! The traffic manager controller (`sonic-tmorch`) validates hierarchy
//! intents and then hands the final hardware-facing action to a device
//! driver through the traits defined here. This crate keeps that boundary
//! type-safe: node, profile and queue ids cannot be mixed, and raw device
//! status codes are turned into Rust errors that keep the driver's text.
//!
//! # Architecture
//!
//! - [`types`]: typed ids, levels, colors and the canonical descriptors
//! - [`error`]: device status codes and [`DeviceError`]
//! - [`api`]: the [`TmDevice`] and [`DeviceResolver`] traits, plus
//!   [`SimDevice`], an in-memory device
//!
//! # Example
//!
//! ```
//! use sonic_tm_device::{Level, NodeDescriptor, NodeId, SimDevice, TmDevice};
//!
//! let device = SimDevice::new(1);
//! let root = NodeDescriptor {
//!     id: NodeId::new(0),
//!     parent: None,
//!     level: Level::ROOT,
//!     priority: 0,
//!     weight: 1,
//!     shaper_profile: None,
//! };
//! device.node_add(&root).unwrap();
//! assert!(device.node_get(NodeId::new(0)).is_some());
//! ```

pub mod api;
pub mod error;
pub mod types;

pub use api::{DeviceContext, DeviceResolver, SimCall, SimDevice, SimOp, StaticResolver, TmDevice};
pub use error::{DeviceError, DeviceResult, DeviceStatus};
pub use types::{
    Color, HierarchyMode, IfIndex, Level, NodeDescriptor, NodeDropStats, NodeId, NodeKind,
    ProfileId, ProfileKind, QueueId, QueueKind, QueueStats, RawTmObjectId, ShaperProfile,
    TmObjectId, TmObjectKind,
};
