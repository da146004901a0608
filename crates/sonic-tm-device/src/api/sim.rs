//! In-memory traffic manager device.
//!
//! `SimDevice` keeps the node and profile tables a real driver would keep
//! and applies the same admission rules, without touching hardware. It is
//! used for configuration dry runs and as the device behind tests.

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};
use parking_lot::Mutex;

use super::TmDevice;
use crate::error::{DeviceError, DeviceResult, DeviceStatus};
use crate::types::{
    HierarchyMode, NodeDescriptor, NodeDropStats, NodeId, ProfileId, QueueId, QueueStats,
    ShaperProfile,
};

/// Device operations that can be failed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
    NodeAdd,
    NodeDelete,
    NodeShaperUpdate,
    ProfileAdd,
    ProfileDelete,
    QueueStats,
    NodeStats,
    HierarchyEnable,
    HierarchyDisable,
}

/// A call received by the device, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCall {
    NodeAdd(NodeId),
    NodeDelete { node: NodeId, free_now: bool },
    NodeShaperUpdate { node: NodeId, profile: ProfileId, defer: bool },
    ProfileAdd(ProfileId),
    ProfileDelete(ProfileId),
    QueueStats(QueueId),
    NodeStats { node: NodeId, clear: bool },
    HierarchyEnable { mode: HierarchyMode, commit_now: bool },
    HierarchyDisable,
}

#[derive(Debug, Default)]
struct SimState {
    nodes: BTreeMap<NodeId, NodeDescriptor>,
    profiles: BTreeMap<ProfileId, ShaperProfile>,
    enabled: Option<HierarchyMode>,
    queue_stats: HashMap<QueueId, QueueStats>,
    node_drops: HashMap<NodeId, NodeDropStats>,
    faults: HashMap<SimOp, DeviceStatus>,
    calls: Vec<SimCall>,
}

impl SimState {
    fn take_fault(&mut self, op: SimOp) -> DeviceResult<()> {
        match self.faults.remove(&op) {
            Some(status) => Err(DeviceError::new(
                status,
                format!("injected failure for {:?}", op),
            )),
            None => Ok(()),
        }
    }

    fn has_children(&self, id: NodeId) -> bool {
        self.nodes.values().any(|node| node.parent == Some(id))
    }

    fn profile_users(&self, id: ProfileId) -> usize {
        self.nodes
            .values()
            .filter(|node| node.shaper_profile == Some(id))
            .count()
    }

    fn leaf_count(&self) -> usize {
        self.nodes
            .keys()
            .filter(|id| !self.has_children(**id))
            .count()
    }
}

/// In-memory traffic manager device.
#[derive(Debug)]
pub struct SimDevice {
    tx_queues: u32,
    state: Mutex<SimState>,
}

impl SimDevice {
    /// Creates a device with `tx_queues` transmit queues and no hierarchy.
    pub fn new(tx_queues: u32) -> Self {
        Self {
            tx_queues,
            state: Mutex::new(SimState::default()),
        }
    }

    /// Returns the number of transmit queues.
    pub fn tx_queues(&self) -> u32 {
        self.tx_queues
    }

    /// Makes the next call of `op` fail with `status`.
    pub fn fail_next(&self, op: SimOp, status: DeviceStatus) {
        self.state.lock().faults.insert(op, status);
    }

    /// Seeds the transmit counters of a queue.
    pub fn set_queue_stats(&self, queue: QueueId, stats: QueueStats) {
        self.state.lock().queue_stats.insert(queue, stats);
    }

    /// Seeds the drop counters of a node.
    pub fn set_node_drops(&self, node: NodeId, stats: NodeDropStats) {
        self.state.lock().node_drops.insert(node, stats);
    }

    /// Returns the calls received so far.
    pub fn calls(&self) -> Vec<SimCall> {
        self.state.lock().calls.clone()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Returns the number of nodes the device holds.
    pub fn node_count(&self) -> usize {
        self.state.lock().nodes.len()
    }

    /// Returns the number of profiles the device holds.
    pub fn profile_count(&self) -> usize {
        self.state.lock().profiles.len()
    }

    /// Returns the number of childless nodes.
    pub fn leaf_count(&self) -> usize {
        self.state.lock().leaf_count()
    }

    /// Returns the enabled hierarchy mode, if any.
    pub fn enabled_mode(&self) -> Option<HierarchyMode> {
        self.state.lock().enabled
    }
}

impl TmDevice for SimDevice {
    fn hierarchy_enabled(&self) -> bool {
        self.state.lock().enabled == Some(HierarchyMode::User)
    }

    fn node_get(&self, id: NodeId) -> Option<NodeDescriptor> {
        self.state.lock().nodes.get(&id).cloned()
    }

    fn node_add(&self, node: &NodeDescriptor) -> DeviceResult<()> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::NodeAdd(node.id));
        state.take_fault(SimOp::NodeAdd)?;

        if state.enabled == Some(HierarchyMode::User) {
            return Err(DeviceError::new(
                DeviceStatus::Busy,
                "hierarchy is enabled, dynamic updates not supported",
            ));
        }
        if state.nodes.contains_key(&node.id) {
            return Err(DeviceError::already_exists(format!("node {}", node.id)));
        }
        if let Some(parent) = node.parent {
            if !state.nodes.contains_key(&parent) {
                return Err(DeviceError::invalid_parameter(format!(
                    "parent node {} does not exist",
                    parent
                )));
            }
        }
        if let Some(profile) = node.shaper_profile {
            if !state.profiles.contains_key(&profile) {
                return Err(DeviceError::not_found(format!("shaper profile {}", profile)));
            }
        }

        debug!("sim: node {} added at level {}", node.id, node.level);
        state.nodes.insert(node.id, node.clone());
        Ok(())
    }

    fn node_delete(&self, id: NodeId, free_now: bool) -> DeviceResult<()> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::NodeDelete { node: id, free_now });
        state.take_fault(SimOp::NodeDelete)?;

        if !state.nodes.contains_key(&id) {
            return Err(DeviceError::not_found(format!("node {}", id)));
        }
        if state.has_children(id) {
            return Err(DeviceError::object_in_use(format!("node {} has children", id)));
        }

        state.nodes.remove(&id);
        state.node_drops.remove(&id);
        debug!("sim: node {} deleted", id);
        Ok(())
    }

    fn node_shaper_update(
        &self,
        node: NodeId,
        profile: ProfileId,
        defer: bool,
    ) -> DeviceResult<()> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::NodeShaperUpdate {
            node,
            profile,
            defer,
        });
        state.take_fault(SimOp::NodeShaperUpdate)?;

        if profile.is_valid() && !state.profiles.contains_key(&profile) {
            return Err(DeviceError::not_found(format!("shaper profile {}", profile)));
        }
        let entry = state
            .nodes
            .get_mut(&node)
            .ok_or_else(|| DeviceError::not_found(format!("node {}", node)))?;
        entry.shaper_profile = profile.is_valid().then_some(profile);
        Ok(())
    }

    fn profile_get(&self, id: ProfileId) -> Option<ShaperProfile> {
        self.state.lock().profiles.get(&id).cloned()
    }

    fn profile_add(&self, profile: &ShaperProfile) -> DeviceResult<()> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::ProfileAdd(profile.id));
        state.take_fault(SimOp::ProfileAdd)?;

        if state.profiles.contains_key(&profile.id) {
            return Err(DeviceError::already_exists(format!(
                "shaper profile {}",
                profile.id
            )));
        }
        if profile.peak_rate > 0 && profile.peak_rate < profile.commit_rate {
            return Err(DeviceError::invalid_parameter(format!(
                "peak rate {} below commit rate {}",
                profile.peak_rate, profile.commit_rate
            )));
        }

        state.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    fn profile_delete(&self, id: ProfileId) -> DeviceResult<()> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::ProfileDelete(id));
        state.take_fault(SimOp::ProfileDelete)?;

        if !state.profiles.contains_key(&id) {
            return Err(DeviceError::not_found(format!("shaper profile {}", id)));
        }
        let users = state.profile_users(id);
        if users > 0 {
            return Err(DeviceError::object_in_use(format!(
                "shaper profile {} referenced by {} node(s)",
                id, users
            )));
        }

        state.profiles.remove(&id);
        Ok(())
    }

    fn queue_stats_get(&self, queue: QueueId) -> DeviceResult<QueueStats> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::QueueStats(queue));
        state.take_fault(SimOp::QueueStats)?;

        if queue.as_raw() >= self.tx_queues {
            return Err(DeviceError::new(
                DeviceStatus::Range,
                format!("queue {} out of range ({} queues)", queue, self.tx_queues),
            ));
        }
        Ok(state.queue_stats.get(&queue).copied().unwrap_or_default())
    }

    fn node_stats_get(&self, node: NodeId, clear: bool) -> DeviceResult<NodeDropStats> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::NodeStats { node, clear });
        state.take_fault(SimOp::NodeStats)?;

        if !state.nodes.contains_key(&node) {
            return Err(DeviceError::not_found(format!("node {}", node)));
        }
        let stats = if clear {
            state.node_drops.remove(&node)
        } else {
            state.node_drops.get(&node).copied()
        };
        Ok(stats.unwrap_or_default())
    }

    fn hierarchy_enable(&self, mode: HierarchyMode, commit_now: bool) -> DeviceResult<()> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::HierarchyEnable { mode, commit_now });
        state.take_fault(SimOp::HierarchyEnable)?;

        let leaves = state.leaf_count();
        if mode == HierarchyMode::User && leaves != self.tx_queues as usize {
            warn!(
                "sim: refusing hierarchy with {} leaves for {} tx queues",
                leaves, self.tx_queues
            );
            return Err(DeviceError::invalid_parameter(format!(
                "leaf count {} does not match {} tx queues",
                leaves, self.tx_queues
            )));
        }

        state.enabled = Some(mode);
        Ok(())
    }

    fn hierarchy_disable(&self) -> DeviceResult<()> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::HierarchyDisable);
        state.take_fault(SimOp::HierarchyDisable)?;

        state.enabled = None;
        Ok(())
    }
}
