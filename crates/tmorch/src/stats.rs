//! Per-node statistics.
//!
//! Leaves report the transmit counters of their queue (see
//! [`HierarchyTree::queue_of`]). Internal nodes have no transmit counters of
//! their own and report drops per color instead.

use serde::Serialize;
use sonic_tm_device::{Color, NodeDropStats, NodeId, QueueStats, TmDevice};

use crate::error::{TmError, TmResult};
use crate::hierarchy::{HierarchyTree, NodeClass};
use crate::{debug_log, warn_log};

/// Transmit counters of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TxCounters {
    pub packets: u64,
    pub bytes: u64,
}

impl From<QueueStats> for TxCounters {
    fn from(stats: QueueStats) -> Self {
        Self {
            packets: stats.tx_packets,
            bytes: stats.tx_bytes,
        }
    }
}

/// Drop counters of one color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ColorCounters {
    pub packets: u64,
    pub bytes: u64,
}

/// Drop counters of an internal node, per color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DropCounters {
    pub green: ColorCounters,
    pub yellow: ColorCounters,
    pub red: ColorCounters,
}

impl DropCounters {
    /// Returns the counters of `color`.
    pub fn color(&self, color: Color) -> ColorCounters {
        match color {
            Color::Green => self.green,
            Color::Yellow => self.yellow,
            Color::Red => self.red,
        }
    }
}

impl From<NodeDropStats> for DropCounters {
    fn from(stats: NodeDropStats) -> Self {
        let counters = |color| ColorCounters {
            packets: stats.packets(color),
            bytes: stats.bytes(color),
        };
        Self {
            green: counters(Color::Green),
            yellow: counters(Color::Yellow),
            red: counters(Color::Red),
        }
    }
}

/// Statistics of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "class", rename_all = "lowercase")]
pub enum NodeStats {
    Leaf { tx: TxCounters },
    Internal { drops: DropCounters },
}

impl NodeStats {
    /// Returns the transmit counters, present for leaves only.
    pub fn tx(&self) -> Option<&TxCounters> {
        match self {
            Self::Leaf { tx } => Some(tx),
            Self::Internal { .. } => None,
        }
    }

    /// Returns the drop counters, present for internal nodes only.
    pub fn drops(&self) -> Option<&DropCounters> {
        match self {
            Self::Leaf { .. } => None,
            Self::Internal { drops } => Some(drops),
        }
    }

    pub fn class(&self) -> NodeClass {
        match self {
            Self::Leaf { .. } => NodeClass::Leaf,
            Self::Internal { .. } => NodeClass::Internal,
        }
    }
}

/// Reads node counters with leaf or internal semantics.
#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
    clear_on_read: bool,
}

impl StatsAggregator {
    /// Creates an aggregator. `clear_on_read` resets drop counters after
    /// each internal node read.
    pub fn new(clear_on_read: bool) -> Self {
        Self { clear_on_read }
    }

    /// Reads the counters of `node`.
    pub fn read(
        &self,
        device: &dyn TmDevice,
        tree: &HierarchyTree,
        node: NodeId,
    ) -> TmResult<NodeStats> {
        let Some(class) = tree.class_of(node) else {
            warn_log!("StatsAggregator", node = node.as_raw(), "Stats requested for unknown node");
            return Err(TmError::not_found(format!("node {}", node)));
        };

        match class {
            NodeClass::Leaf => {
                let queue = tree.queue_of(node).ok_or_else(|| {
                    TmError::internal(format!("leaf node {} has no transmit queue", node))
                })?;
                let tx = TxCounters::from(
                    device
                        .queue_stats_get(queue)
                        .map_err(|e| TmError::rejected("queue stats read", e))?,
                );
                debug_log!(
                    "StatsAggregator",
                    node = node.as_raw(),
                    queue = queue.as_raw(),
                    packets = tx.packets,
                    bytes = tx.bytes,
                    "Leaf stats read"
                );
                Ok(NodeStats::Leaf { tx })
            }
            NodeClass::Internal => {
                let drops = DropCounters::from(
                    device
                        .node_stats_get(node, self.clear_on_read)
                        .map_err(|e| TmError::rejected("node stats read", e))?,
                );
                Ok(NodeStats::Internal { drops })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TmErrorKind;
    use crate::hierarchy::NodeParams;
    use pretty_assertions::assert_eq;
    use sonic_tm_device::{DeviceStatus, QueueId, SimCall, SimDevice, SimOp};

    fn setup() -> (SimDevice, HierarchyTree) {
        let device = SimDevice::new(2);
        let mut tree = HierarchyTree::new(8);
        for params in [
            NodeParams::root(NodeId::new(10)),
            NodeParams::child(NodeId::new(0), NodeId::new(10)),
            NodeParams::child(NodeId::new(1), NodeId::new(10)),
        ] {
            let node = tree.plan_node(&params).unwrap();
            device.node_add(&node.descriptor()).unwrap();
            tree.insert(node);
        }
        (device, tree)
    }

    #[test]
    fn test_leaf_reads_queue() {
        let (device, tree) = setup();
        device.set_queue_stats(
            QueueId::new(1),
            QueueStats {
                tx_packets: 5,
                tx_bytes: 320,
            },
        );

        let stats = StatsAggregator::default()
            .read(&device, &tree, NodeId::new(1))
            .unwrap();
        assert_eq!(
            stats,
            NodeStats::Leaf {
                tx: TxCounters {
                    packets: 5,
                    bytes: 320
                }
            }
        );
        assert!(stats.drops().is_none());
    }

    #[test]
    fn test_leaf_reads_queue_by_position() {
        let device = SimDevice::new(1);
        let mut tree = HierarchyTree::new(4);
        for params in [
            NodeParams::root(NodeId::new(0)),
            NodeParams::child(NodeId::new(5), NodeId::new(0)),
        ] {
            let node = tree.plan_node(&params).unwrap();
            device.node_add(&node.descriptor()).unwrap();
            tree.insert(node);
        }
        device.set_queue_stats(
            QueueId::new(0),
            QueueStats {
                tx_packets: 3,
                tx_bytes: 180,
            },
        );

        let stats = StatsAggregator::default()
            .read(&device, &tree, NodeId::new(5))
            .unwrap();
        assert_eq!(stats.tx().map(|tx| tx.packets), Some(3));
        assert_eq!(device.calls().last(), Some(&SimCall::QueueStats(QueueId::new(0))));
    }

    #[test]
    fn test_internal_reads_drops() {
        let (device, tree) = setup();
        let mut drops = NodeDropStats::default();
        drops.packets[Color::Red.index()] = 7;
        drops.bytes[Color::Red.index()] = 700;
        device.set_node_drops(NodeId::new(10), drops);

        let stats = StatsAggregator::default()
            .read(&device, &tree, NodeId::new(10))
            .unwrap();
        assert!(stats.tx().is_none());
        let red = stats.drops().unwrap().color(Color::Red);
        assert_eq!(red, ColorCounters { packets: 7, bytes: 700 });
        assert_eq!(
            device.calls().last(),
            Some(&SimCall::NodeStats {
                node: NodeId::new(10),
                clear: false
            })
        );
    }

    #[test]
    fn test_clear_on_read() {
        let (device, tree) = setup();
        let mut drops = NodeDropStats::default();
        drops.packets[Color::Red.index()] = 7;
        device.set_node_drops(NodeId::new(10), drops);

        let aggregator = StatsAggregator::new(true);
        let first = aggregator.read(&device, &tree, NodeId::new(10)).unwrap();
        let second = aggregator.read(&device, &tree, NodeId::new(10)).unwrap();
        assert_eq!(first.drops().unwrap().red.packets, 7);
        assert_eq!(second.drops().unwrap().red.packets, 0);
    }

    #[test]
    fn test_unknown_node() {
        let (device, tree) = setup();
        let err = StatsAggregator::default()
            .read(&device, &tree, NodeId::new(99))
            .unwrap_err();
        assert_eq!(err.kind(), TmErrorKind::NotFound);
    }

    #[test]
    fn test_device_failure() {
        let (device, tree) = setup();
        device.fail_next(SimOp::QueueStats, DeviceStatus::Io);
        let err = StatsAggregator::default()
            .read(&device, &tree, NodeId::new(0))
            .unwrap_err();
        assert_eq!(err.kind(), TmErrorKind::HardwareRejected);
    }

    #[test]
    fn test_serialize_tagged() {
        let stats = NodeStats::Leaf {
            tx: TxCounters {
                packets: 1,
                bytes: 2,
            },
        };
        assert_eq!(
            serde_json::to_string(&stats).unwrap(),
            r#"{"class":"leaf","tx":{"packets":1,"bytes":2}}"#
        );
    }
}
