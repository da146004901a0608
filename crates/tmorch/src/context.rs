//! Per-device traffic manager state.
//!
//! A [`TmContext`] owns the profile registry, the hierarchy tree and the
//! activation state of one device. Every intent is validated against that
//! state before the device is called, and emits one audit record.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use sonic_tm_device::{DeviceContext, DeviceStatus, NodeId, ProfileId, TmDevice};

use crate::audit::{AuditAction, AuditObject, AuditRecord};
use crate::binding::{DefaultsEngine, DropColoring};
use crate::config::TmOrchConfig;
use crate::error::{TmError, TmErrorKind, TmResult};
use crate::hierarchy::{HierarchyTree, NodeClass, NodeParams};
use crate::lifecycle::{ActivationState, LifecycleController};
use crate::shaper::{ShaperParams, ShaperRegistry};
use crate::stats::{NodeStats, StatsAggregator};
use crate::{audit_log, debug_log, info_log};

/// Operation counters of a context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TmOrchStats {
    /// Number of shaper profiles created.
    pub profiles_created: u64,
    /// Number of shaper profiles deleted.
    pub profiles_deleted: u64,
    /// Number of nodes added.
    pub nodes_added: u64,
    /// Number of nodes deleted.
    pub nodes_deleted: u64,
    /// Number of shaper rebinds.
    pub shaper_updates: u64,
    /// Number of successful activations.
    pub starts: u64,
    /// Number of successful deactivations.
    pub stops: u64,
    /// Number of successful stats reads.
    pub stats_reads: u64,
    /// Number of failed operations.
    pub failures: u64,
}

/// Serializable view of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSnapshot {
    pub id: u32,
    pub commit_rate: u64,
    pub commit_burst: u64,
    pub peak_rate: u64,
    pub peak_burst: u64,
    pub pkt_len_adj: i32,
    pub pkt_mode: bool,
}

/// Serializable view of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    pub id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
    pub level: u32,
    pub priority: u32,
    pub weight: u32,
    pub class: NodeClass,
    /// Transmit queue wired to a leaf
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shaper_profile: Option<u32>,
    pub drop_coloring: DropColoring,
}

/// Serializable view of a whole hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchySnapshot {
    pub device: String,
    pub state: ActivationState,
    pub tx_queues: u32,
    pub leaf_count: usize,
    pub profiles: Vec<ProfileSnapshot>,
    pub nodes: Vec<NodeSnapshot>,
    pub stats: TmOrchStats,
}

/// Traffic manager state of one device.
pub struct TmContext {
    name: String,
    tx_queues: u32,
    device: Arc<dyn TmDevice>,
    registry: ShaperRegistry,
    tree: HierarchyTree,
    defaults: DefaultsEngine,
    lifecycle: LifecycleController,
    aggregator: StatsAggregator,
    stats: TmOrchStats,
}

impl fmt::Debug for TmContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmContext")
            .field("name", &self.name)
            .field("tx_queues", &self.tx_queues)
            .field("state", &self.lifecycle.state())
            .field("profile_count", &self.registry.len())
            .field("node_count", &self.tree.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl TmContext {
    /// Creates the context of a resolved device.
    ///
    /// The activation state starts out mirroring the device, so a hierarchy
    /// that is already enabled stays locked until stopped.
    pub fn new(device: DeviceContext, config: &TmOrchConfig) -> Self {
        let lifecycle = LifecycleController::from_device(device.device.as_ref());
        info_log!(
            "TmContext",
            device = %device.name,
            tx_queues = device.tx_queues,
            state = %lifecycle.state(),
            "Traffic manager context created"
        );
        Self {
            name: device.name,
            tx_queues: device.tx_queues,
            device: device.device,
            registry: ShaperRegistry::new(config.max_profiles),
            tree: HierarchyTree::new(config.max_nodes),
            defaults: DefaultsEngine::new(config.drop_coloring.clone()),
            lifecycle,
            aggregator: StatsAggregator::new(config.clear_stats_on_read),
            stats: TmOrchStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tx_queues(&self) -> u32 {
        self.tx_queues
    }

    pub fn state(&self) -> ActivationState {
        self.lifecycle.state()
    }

    pub fn tree(&self) -> &HierarchyTree {
        &self.tree
    }

    pub fn registry(&self) -> &ShaperRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &TmOrchStats {
        &self.stats
    }

    pub fn leaf_count(&self) -> usize {
        self.tree.leaf_count()
    }

    /// Creates a shaper profile.
    pub fn shaper_profile_create(&mut self, params: &ShaperParams) -> TmResult<ProfileId> {
        let result = self
            .lifecycle
            .ensure_mutable("create shaper profile")
            .and_then(|()| self.registry.create(self.device.as_ref(), params));
        if result.is_ok() {
            self.stats.profiles_created += 1;
        }
        self.audit(
            AuditAction::ProfileCreate,
            AuditObject::ShaperProfile(params.id.as_raw()),
            Some(json!({
                "commit_rate": params.commit_rate,
                "peak_rate": params.peak_rate,
                "pkt_mode": params.pkt_mode,
            })),
            &result,
        );
        result
    }

    /// Deletes a shaper profile. Allowed while the hierarchy is active.
    pub fn shaper_profile_delete(&mut self, id: ProfileId) -> TmResult<()> {
        let result = self.registry.delete(self.device.as_ref(), id);
        if result.is_ok() {
            self.stats.profiles_deleted += 1;
        }
        self.audit(
            AuditAction::ProfileDelete,
            AuditObject::ShaperProfile(id.as_raw()),
            None,
            &result,
        );
        result
    }

    /// Adds a node to the hierarchy.
    pub fn node_add(&mut self, params: &NodeParams) -> TmResult<()> {
        let result = self.add_node_inner(params);
        if result.is_ok() {
            self.stats.nodes_added += 1;
        }
        let added = result.as_ref().ok().and_then(|_| self.tree.get(params.id));
        let details = added.map(|node| {
            json!({
                "parent": node.parent().map(|p| p.as_raw()),
                "level": node.level().as_u32(),
                "shaper_profile": node.shaper_profile().map(|p| p.as_raw()),
            })
        });
        self.audit(
            AuditAction::NodeAdd,
            AuditObject::Node(params.id.as_raw()),
            details,
            &result,
        );
        result
    }

    fn add_node_inner(&mut self, params: &NodeParams) -> TmResult<()> {
        self.lifecycle.ensure_mutable("add node")?;
        let node = self.tree.plan_node(params)?;

        let profile = params
            .shaper_profile
            .and_then(|id| self.registry.lookup(id))
            .cloned();
        let unresolved = params.shaper_profile.is_some() && profile.is_none();

        if let Err(e) = self.device.node_add(&node.descriptor()) {
            if unresolved && e.status() == DeviceStatus::ItemNotFound {
                let id = params.shaper_profile.unwrap_or_default();
                return Err(TmError::not_found(format!("shaper profile {}", id)));
            }
            return Err(TmError::from_device_alloc("node add", "tm node", e));
        }

        let id = node.id();
        self.tree.insert(node);
        self.defaults.apply(&mut self.tree, id, profile.as_ref())?;
        debug_log!(
            "TmContext",
            device = %self.name,
            node = id.as_raw(),
            leaf_count = self.tree.leaf_count(),
            "Node added"
        );
        Ok(())
    }

    /// Deletes a node from the hierarchy.
    pub fn node_delete(&mut self, id: NodeId) -> TmResult<()> {
        let result = self.delete_node_inner(id);
        if result.is_ok() {
            self.stats.nodes_deleted += 1;
        }
        self.audit(
            AuditAction::NodeDelete,
            AuditObject::Node(id.as_raw()),
            None,
            &result,
        );
        result
    }

    fn delete_node_inner(&mut self, id: NodeId) -> TmResult<()> {
        self.lifecycle.ensure_mutable("delete node")?;
        if !id.is_valid() {
            return Err(TmError::invalid_argument(
                "node_id",
                "reserved invalid id cannot name a node",
            ));
        }
        if !self.tree.contains(id) {
            return Err(TmError::not_found(format!("node {}", id)));
        }

        self.device
            .node_delete(id, true)
            .map_err(|e| TmError::rejected("node delete", e))?;
        self.tree.remove(id);
        Ok(())
    }

    /// Rebinds the shaper of a node. [`ProfileId::INVALID`] detaches it.
    pub fn node_shaper_update(&mut self, node: NodeId, profile: ProfileId) -> TmResult<()> {
        let result = self
            .defaults
            .bind_shaper(
                self.device.as_ref(),
                &mut self.tree,
                &self.registry,
                node,
                profile,
            )
            .map(|_| ());
        if result.is_ok() {
            self.stats.shaper_updates += 1;
        }
        self.audit(
            AuditAction::ShaperUpdate,
            AuditObject::Node(node.as_raw()),
            Some(json!({
                "shaper_profile": profile.is_valid().then(|| profile.as_raw()),
            })),
            &result,
        );
        result
    }

    /// Reads the counters of a node.
    pub fn node_read_stats(&mut self, node: NodeId) -> TmResult<NodeStats> {
        let result = self.aggregator.read(self.device.as_ref(), &self.tree, node);
        match &result {
            Ok(_) => self.stats.stats_reads += 1,
            Err(_) => self.stats.failures += 1,
        }
        result
    }

    /// Activates the hierarchy.
    pub fn start(&mut self) -> TmResult<()> {
        let leaf_count = self.tree.leaf_count();
        let result = self
            .lifecycle
            .start(self.device.as_ref(), leaf_count, self.tx_queues);
        if result.is_ok() {
            self.stats.starts += 1;
        }
        self.audit(
            AuditAction::HierarchyStart,
            AuditObject::Hierarchy,
            Some(json!({
                "leaf_count": leaf_count,
                "tx_queues": self.tx_queues,
            })),
            &result,
        );
        result
    }

    /// Deactivates the hierarchy.
    pub fn stop(&mut self) -> TmResult<()> {
        let result = self.lifecycle.stop(self.device.as_ref());
        if result.is_ok() {
            self.stats.stops += 1;
        }
        self.audit(
            AuditAction::HierarchyStop,
            AuditObject::Hierarchy,
            None,
            &result,
        );
        result
    }

    /// Returns a serializable view of the hierarchy.
    pub fn snapshot(&self) -> HierarchySnapshot {
        HierarchySnapshot {
            device: self.name.clone(),
            state: self.lifecycle.state(),
            tx_queues: self.tx_queues,
            leaf_count: self.tree.leaf_count(),
            profiles: self
                .registry
                .iter()
                .map(|p| ProfileSnapshot {
                    id: p.id.as_raw(),
                    commit_rate: p.commit_rate,
                    commit_burst: p.commit_burst,
                    peak_rate: p.peak_rate,
                    peak_burst: p.peak_burst,
                    pkt_len_adj: p.pkt_len_adj,
                    pkt_mode: p.pkt_mode,
                })
                .collect(),
            nodes: self
                .tree
                .iter()
                .map(|n| NodeSnapshot {
                    id: n.id().as_raw(),
                    parent: n.parent().map(|p| p.as_raw()),
                    level: n.level().as_u32(),
                    priority: n.priority(),
                    weight: n.weight(),
                    class: n.class(),
                    queue: self.tree.queue_of(n.id()).map(|q| q.as_raw()),
                    shaper_profile: n.shaper_profile().map(|p| p.as_raw()),
                    drop_coloring: *n.drop_coloring(),
                })
                .collect(),
            stats: self.stats.clone(),
        }
    }

    fn audit<T>(
        &mut self,
        action: AuditAction,
        object: AuditObject,
        details: Option<serde_json::Value>,
        result: &TmResult<T>,
    ) {
        let mut record = AuditRecord::new(self.name.as_str(), action, object);
        if let Some(details) = details {
            record = record.with_details(details);
        }
        let record = match result {
            Ok(_) => record,
            Err(e) => {
                self.stats.failures += 1;
                if e.kind() == TmErrorKind::HierarchyLocked {
                    record.denied(e.to_string())
                } else {
                    record.failed(e.to_string())
                }
            }
        };
        audit_log!(record);
    }
}
