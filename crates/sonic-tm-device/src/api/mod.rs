//! Device-capability interface consumed by the traffic manager controller.
//!
//! The controller never programs hardware itself. Every structural change,
//! shaper binding, activation and counter read is delegated to a
//! [`TmDevice`] implementation supplied by the device driver. The calls are
//! synchronous and bounded; retrying is the driver's business.
//!
//! - [`TmDevice`]: per-device operations (nodes, profiles, counters, enable)
//! - [`DeviceResolver`]: resolves an interface handle to a [`DeviceContext`]
//! - [`sim`]: in-memory reference device used for dry runs and tests

pub mod sim;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::DeviceResult;
use crate::types::{
    HierarchyMode, IfIndex, NodeDescriptor, NodeDropStats, NodeId, ProfileId, QueueId,
    QueueStats, ShaperProfile,
};

pub use sim::{SimCall, SimDevice, SimOp};

/// Operations a traffic manager capable device exposes.
pub trait TmDevice: Send + Sync {
    /// Returns true while a user-defined hierarchy is enabled.
    fn hierarchy_enabled(&self) -> bool;

    /// Looks up a node known to the device.
    fn node_get(&self, id: NodeId) -> Option<NodeDescriptor>;

    /// Creates a node.
    fn node_add(&self, node: &NodeDescriptor) -> DeviceResult<()>;

    /// Deletes a node, releasing its resources immediately when `free_now`.
    fn node_delete(&self, id: NodeId, free_now: bool) -> DeviceResult<()>;

    /// Rebinds the shaper profile of a node. `ProfileId::INVALID` detaches.
    fn node_shaper_update(&self, node: NodeId, profile: ProfileId, defer: bool)
        -> DeviceResult<()>;

    /// Looks up a shaper profile known to the device.
    fn profile_get(&self, id: ProfileId) -> Option<ShaperProfile>;

    /// Installs a shaper profile.
    fn profile_add(&self, profile: &ShaperProfile) -> DeviceResult<()>;

    /// Removes a shaper profile.
    fn profile_delete(&self, id: ProfileId) -> DeviceResult<()>;

    /// Reads the transmit counters of a queue.
    fn queue_stats_get(&self, queue: QueueId) -> DeviceResult<QueueStats>;

    /// Reads the drop counters of a node, resetting them when `clear`.
    fn node_stats_get(&self, node: NodeId, clear: bool) -> DeviceResult<NodeDropStats>;

    /// Enables the hierarchy.
    fn hierarchy_enable(&self, mode: HierarchyMode, commit_now: bool) -> DeviceResult<()>;

    /// Disables the hierarchy.
    fn hierarchy_disable(&self) -> DeviceResult<()>;
}

/// Device state resolved from an interface handle.
#[derive(Clone)]
pub struct DeviceContext {
    /// Device name, used in log messages.
    pub name: String,
    /// Number of transmit queues configured on the port.
    pub tx_queues: u32,
    /// The device operations.
    pub device: Arc<dyn TmDevice>,
}

impl DeviceContext {
    /// Creates a device context.
    pub fn new(name: impl Into<String>, tx_queues: u32, device: Arc<dyn TmDevice>) -> Self {
        Self {
            name: name.into(),
            tx_queues,
            device,
        }
    }
}

impl fmt::Debug for DeviceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceContext")
            .field("name", &self.name)
            .field("tx_queues", &self.tx_queues)
            .field("hierarchy_enabled", &self.device.hierarchy_enabled())
            .finish()
    }
}

/// Resolves interface handles to device contexts.
pub trait DeviceResolver: Send + Sync {
    /// Returns the device behind `if_index`, if any.
    fn device_context(&self, if_index: IfIndex) -> Option<DeviceContext>;
}

/// Map-backed resolver for a fixed set of interfaces.
#[derive(Debug, Default)]
pub struct StaticResolver {
    devices: HashMap<IfIndex, DeviceContext>,
}

impl StaticResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the device behind an interface, replacing any previous one.
    pub fn insert(&mut self, if_index: IfIndex, context: DeviceContext) -> Option<DeviceContext> {
        self.devices.insert(if_index, context)
    }

    /// Forgets an interface.
    pub fn remove(&mut self, if_index: IfIndex) -> Option<DeviceContext> {
        self.devices.remove(&if_index)
    }

    /// Returns the number of registered interfaces.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns true if no interface is registered.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl DeviceResolver for StaticResolver {
    fn device_context(&self, if_index: IfIndex) -> Option<DeviceContext> {
        self.devices.get(&if_index).cloned()
    }
}
