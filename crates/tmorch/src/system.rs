//! Interface-keyed traffic manager operations.
//!
//! [`TmOps`] is the operation table exposed to the orchestration layer.
//! [`TmSystem`] implements it by resolving each interface handle to its
//! device on first use and keeping one independent [`TmContext`] per
//! interface.

use std::collections::HashMap;
use std::sync::Arc;

use sonic_tm_device::{DeviceResolver, IfIndex, NodeId, ProfileId};

use crate::config::TmOrchConfig;
use crate::context::{HierarchySnapshot, TmContext};
use crate::error::{TmError, TmResult};
use crate::hierarchy::NodeParams;
use crate::shaper::ShaperParams;
use crate::stats::NodeStats;
use crate::warn_log;

/// Traffic manager operations addressed by interface.
///
/// Callers serialize intents per interface; implementations do not lock.
pub trait TmOps {
    /// Adds a node to the interface hierarchy.
    fn node_add(&mut self, if_index: IfIndex, params: &NodeParams) -> TmResult<()>;

    /// Deletes a node from the interface hierarchy.
    fn node_delete(&mut self, if_index: IfIndex, node: NodeId) -> TmResult<()>;

    /// Reads the counters of a node.
    fn node_read_stats(&mut self, if_index: IfIndex, node: NodeId) -> TmResult<NodeStats>;

    /// Creates a shaper profile.
    fn shaper_profile_create(
        &mut self,
        if_index: IfIndex,
        params: &ShaperParams,
    ) -> TmResult<ProfileId>;

    /// Rebinds the shaper of a node.
    fn node_shaper_update(
        &mut self,
        if_index: IfIndex,
        node: NodeId,
        profile: ProfileId,
    ) -> TmResult<()>;

    /// Deletes a shaper profile.
    fn shaper_profile_delete(&mut self, if_index: IfIndex, profile: ProfileId) -> TmResult<()>;

    /// Activates the interface hierarchy.
    fn start_tm(&mut self, if_index: IfIndex) -> TmResult<()>;

    /// Deactivates the interface hierarchy.
    fn stop_tm(&mut self, if_index: IfIndex) -> TmResult<()>;
}

/// Traffic manager state of every interface.
pub struct TmSystem {
    resolver: Arc<dyn DeviceResolver>,
    config: TmOrchConfig,
    contexts: HashMap<IfIndex, TmContext>,
}

impl std::fmt::Debug for TmSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmSystem")
            .field("config", &self.config)
            .field("contexts", &self.contexts)
            .finish()
    }
}

impl TmSystem {
    /// Creates a system resolving devices through `resolver`.
    pub fn new(resolver: Arc<dyn DeviceResolver>, config: TmOrchConfig) -> Self {
        Self {
            resolver,
            config,
            contexts: HashMap::new(),
        }
    }

    pub fn config(&self) -> &TmOrchConfig {
        &self.config
    }

    /// Returns the context of an interface already in use.
    pub fn context(&self, if_index: IfIndex) -> Option<&TmContext> {
        self.contexts.get(&if_index)
    }

    /// Returns the context of an interface, resolving its device on first use.
    pub fn context_mut(&mut self, if_index: IfIndex) -> TmResult<&mut TmContext> {
        if !self.contexts.contains_key(&if_index) {
            let Some(device) = self.resolver.device_context(if_index) else {
                warn_log!("TmSystem", interface = %if_index, "No device behind interface");
                return Err(TmError::not_found(format!("interface {}", if_index)));
            };
            self.contexts
                .insert(if_index, TmContext::new(device, &self.config));
        }
        self.contexts
            .get_mut(&if_index)
            .ok_or_else(|| TmError::internal(format!("context for {} vanished", if_index)))
    }

    /// Returns a snapshot of an interface hierarchy.
    pub fn snapshot(&self, if_index: IfIndex) -> Option<HierarchySnapshot> {
        self.context(if_index).map(TmContext::snapshot)
    }

    /// Returns the number of interfaces in use.
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }
}

impl TmOps for TmSystem {
    fn node_add(&mut self, if_index: IfIndex, params: &NodeParams) -> TmResult<()> {
        self.context_mut(if_index)?.node_add(params)
    }

    fn node_delete(&mut self, if_index: IfIndex, node: NodeId) -> TmResult<()> {
        self.context_mut(if_index)?.node_delete(node)
    }

    fn node_read_stats(&mut self, if_index: IfIndex, node: NodeId) -> TmResult<NodeStats> {
        self.context_mut(if_index)?.node_read_stats(node)
    }

    fn shaper_profile_create(
        &mut self,
        if_index: IfIndex,
        params: &ShaperParams,
    ) -> TmResult<ProfileId> {
        self.context_mut(if_index)?.shaper_profile_create(params)
    }

    fn node_shaper_update(
        &mut self,
        if_index: IfIndex,
        node: NodeId,
        profile: ProfileId,
    ) -> TmResult<()> {
        self.context_mut(if_index)?.node_shaper_update(node, profile)
    }

    fn shaper_profile_delete(&mut self, if_index: IfIndex, profile: ProfileId) -> TmResult<()> {
        self.context_mut(if_index)?.shaper_profile_delete(profile)
    }

    fn start_tm(&mut self, if_index: IfIndex) -> TmResult<()> {
        self.context_mut(if_index)?.start()
    }

    fn stop_tm(&mut self, if_index: IfIndex) -> TmResult<()> {
        self.context_mut(if_index)?.stop()
    }
}
