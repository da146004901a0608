//! Integration tests for tmorch with the in-memory device layer
//!
//! These tests drive `TmSystem` through the `TmOps` table the way an
//! orchestration layer would, and check the resulting hierarchy and device
//! state.

use std::io::Write;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use sonic_tm_device::{
    Color, DeviceContext, DeviceStatus, IfIndex, Level, NodeDropStats, NodeId, ProfileId,
    QueueId, QueueStats, SimCall, SimDevice, SimOp, StaticResolver, TmDevice,
};
use sonic_tmorch::{
    ActivationState, HierarchyFile, NodeClass, NodeParams, RedAlgorithm, ShaperParams,
    TmErrorKind, TmOps, TmOrchConfig, TmSystem,
};

const PORT: IfIndex = IfIndex::new(3);

fn setup(tx_queues: u32) -> (Arc<SimDevice>, TmSystem) {
    setup_with(tx_queues, TmOrchConfig::default())
}

fn setup_with(tx_queues: u32, config: TmOrchConfig) -> (Arc<SimDevice>, TmSystem) {
    let device = Arc::new(SimDevice::new(tx_queues));
    let mut resolver = StaticResolver::new();
    resolver.insert(PORT, DeviceContext::new("Ethernet0", tx_queues, device.clone()));
    (device, TmSystem::new(Arc::new(resolver), config))
}

fn state(system: &TmSystem) -> ActivationState {
    system.context(PORT).map(|ctx| ctx.state()).unwrap_or_default()
}

#[test]
fn test_single_queue_lifecycle() {
    let (device, mut system) = setup(1);

    let id = system
        .shaper_profile_create(PORT, &ShaperParams::new(ProfileId::new(1), 1000, 0))
        .unwrap();
    let ctx = system.context(PORT).unwrap();
    assert_eq!(ctx.registry().get(id).unwrap().commit_rate, 8000);

    system.node_add(PORT, &NodeParams::root(NodeId::new(0))).unwrap();
    system
        .node_add(
            PORT,
            &NodeParams::child(NodeId::new(1), NodeId::new(0)).with_profile(ProfileId::new(1)),
        )
        .unwrap();
    let ctx = system.context(PORT).unwrap();
    assert_eq!(ctx.tree().get(NodeId::new(1)).unwrap().level(), Level::new(1));
    assert_eq!(ctx.leaf_count(), 1);

    system.start_tm(PORT).unwrap();
    assert_eq!(state(&system), ActivationState::Active);
    assert!(device.hierarchy_enabled());

    device.set_queue_stats(
        QueueId::new(0),
        QueueStats {
            tx_packets: 42,
            tx_bytes: 4200,
        },
    );
    let stats = system.node_read_stats(PORT, NodeId::new(1)).unwrap();
    assert_eq!(stats.tx().map(|tx| (tx.packets, tx.bytes)), Some((42, 4200)));
    let snapshot = system.snapshot(PORT).unwrap();
    assert_eq!(snapshot.nodes[1].queue, Some(0));
    assert_eq!(snapshot.nodes[0].queue, None);

    let err = system
        .node_add(PORT, &NodeParams::child(NodeId::new(2), NodeId::new(0)))
        .unwrap_err();
    assert_eq!(err.kind(), TmErrorKind::HierarchyLocked);

    system.stop_tm(PORT).unwrap();
    system.node_delete(PORT, NodeId::new(1)).unwrap();
    assert_eq!(state(&system), ActivationState::Inactive);
    assert!(device.node_get(NodeId::new(1)).is_none());
}

#[test]
fn test_unknown_parent_leaves_hierarchy_unchanged() {
    let (device, mut system) = setup(2);
    system.node_add(PORT, &NodeParams::root(NodeId::new(0))).unwrap();
    system
        .node_add(PORT, &NodeParams::child(NodeId::new(1), NodeId::new(0)))
        .unwrap();
    device.clear_calls();

    let err = system
        .node_add(PORT, &NodeParams::child(NodeId::new(2), NodeId::new(42)))
        .unwrap_err();
    assert_eq!(err.kind(), TmErrorKind::NotFound);

    let ctx = system.context(PORT).unwrap();
    assert_eq!(ctx.leaf_count(), 1);
    assert_eq!(ctx.tree().len(), 2);
    assert!(device.calls().is_empty());
}

#[test]
fn test_byte_and_packet_mode_profiles() {
    let (_, mut system) = setup(1);
    system
        .shaper_profile_create(
            PORT,
            &ShaperParams::new(ProfileId::new(1), 1000, 200).with_peak(3000, 400),
        )
        .unwrap();
    system
        .shaper_profile_create(
            PORT,
            &ShaperParams::new(ProfileId::new(2), 1000, 200)
                .with_peak(3000, 400)
                .in_packets(),
        )
        .unwrap();

    let registry = system.context(PORT).unwrap().registry();
    let bytes = registry.get(ProfileId::new(1)).unwrap();
    assert_eq!(
        (bytes.commit_rate, bytes.commit_burst, bytes.peak_rate, bytes.peak_burst),
        (8000, 1600, 24000, 3200)
    );
    let packets = registry.get(ProfileId::new(2)).unwrap();
    assert_eq!(
        (packets.commit_rate, packets.commit_burst, packets.peak_rate, packets.peak_burst),
        (1000, 200, 3000, 400)
    );
}

#[test]
fn test_second_root_rejected() {
    let (_, mut system) = setup(1);
    system.node_add(PORT, &NodeParams::root(NodeId::new(0))).unwrap();

    let err = system
        .node_add(PORT, &NodeParams::root(NodeId::new(1)))
        .unwrap_err();
    assert_eq!(err.kind(), TmErrorKind::AlreadyExists);
}

#[test]
fn test_level_ignores_requested_value() {
    let (_, mut system) = setup(1);
    system.node_add(PORT, &NodeParams::root(NodeId::new(0))).unwrap();
    system
        .node_add(
            PORT,
            &NodeParams::child(NodeId::new(10), NodeId::new(0)).with_level(Level::new(5)),
        )
        .unwrap();
    system
        .node_add(
            PORT,
            &NodeParams::child(NodeId::new(20), NodeId::new(10)).with_level(Level::new(1)),
        )
        .unwrap();

    let tree = system.context(PORT).unwrap().tree();
    assert_eq!(tree.get(NodeId::new(10)).unwrap().level(), Level::new(1));
    assert_eq!(tree.get(NodeId::new(20)).unwrap().level(), Level::new(2));
}

#[test]
fn test_start_requires_complete_hierarchy() {
    let (device, mut system) = setup(2);
    system.node_add(PORT, &NodeParams::root(NodeId::new(10))).unwrap();
    system
        .node_add(PORT, &NodeParams::child(NodeId::new(0), NodeId::new(10)))
        .unwrap();

    let err = system.start_tm(PORT).unwrap_err();
    assert_eq!(err.kind(), TmErrorKind::IncompleteHierarchy);
    assert_eq!(state(&system), ActivationState::Inactive);
    assert!(!device
        .calls()
        .iter()
        .any(|call| matches!(call, SimCall::HierarchyEnable { .. })));

    system
        .node_add(PORT, &NodeParams::child(NodeId::new(1), NodeId::new(10)))
        .unwrap();
    device.clear_calls();
    system.start_tm(PORT).unwrap();
    assert_eq!(
        device.calls(),
        vec![
            SimCall::HierarchyDisable,
            SimCall::HierarchyEnable {
                mode: sonic_tm_device::HierarchyMode::User,
                commit_now: true
            }
        ]
    );
}

#[test]
fn test_superset_of_leaves_rejected_by_device() {
    let (_, mut system) = setup(1);
    system.node_add(PORT, &NodeParams::root(NodeId::new(10))).unwrap();
    for id in 0..2 {
        system
            .node_add(PORT, &NodeParams::child(NodeId::new(id), NodeId::new(10)))
            .unwrap();
    }

    let err = system.start_tm(PORT).unwrap_err();
    assert_eq!(err.kind(), TmErrorKind::HardwareRejected);
    assert_eq!(state(&system), ActivationState::Inactive);
}

#[test]
fn test_mutations_locked_while_active() {
    let (_, mut system) = setup(1);
    system.node_add(PORT, &NodeParams::root(NodeId::new(0))).unwrap();
    system.start_tm(PORT).unwrap();

    let add = system.node_add(PORT, &NodeParams::child(NodeId::new(1), NodeId::new(0)));
    let delete = system.node_delete(PORT, NodeId::new(0));
    let create =
        system.shaper_profile_create(PORT, &ShaperParams::new(ProfileId::new(1), 100, 10));

    assert_eq!(add.unwrap_err().kind(), TmErrorKind::HierarchyLocked);
    assert_eq!(delete.unwrap_err().kind(), TmErrorKind::HierarchyLocked);
    assert_eq!(create.unwrap_err().kind(), TmErrorKind::HierarchyLocked);
    assert_eq!(system.context(PORT).unwrap().stats().failures, 3);
}

#[test]
fn test_stop_is_idempotent() {
    let (_, mut system) = setup(1);
    system.node_add(PORT, &NodeParams::root(NodeId::new(0))).unwrap();
    system.start_tm(PORT).unwrap();

    system.stop_tm(PORT).unwrap();
    system.stop_tm(PORT).unwrap();
    assert_eq!(state(&system), ActivationState::Inactive);

    system.start_tm(PORT).unwrap();
    assert_eq!(state(&system), ActivationState::Active);
}

#[test]
fn test_stop_failure_is_internal() {
    let (device, mut system) = setup(1);
    system.node_add(PORT, &NodeParams::root(NodeId::new(0))).unwrap();
    system.start_tm(PORT).unwrap();
    device.fail_next(SimOp::HierarchyDisable, DeviceStatus::Io);

    let err = system.stop_tm(PORT).unwrap_err();
    assert_eq!(err.kind(), TmErrorKind::Internal);
    assert!(err.to_string().contains("TM_STATUS_IO"));
    assert_eq!(state(&system), ActivationState::Active);
}

#[test]
fn test_stats_semantics() {
    let (device, mut system) = setup(2);
    system.node_add(PORT, &NodeParams::root(NodeId::new(10))).unwrap();
    for id in 0..2 {
        system
            .node_add(PORT, &NodeParams::child(NodeId::new(id), NodeId::new(10)))
            .unwrap();
    }
    device.set_queue_stats(
        QueueId::new(1),
        QueueStats {
            tx_packets: 12,
            tx_bytes: 1500,
        },
    );
    let mut drops = NodeDropStats::default();
    drops.packets[Color::Red.index()] = 4;
    drops.bytes[Color::Red.index()] = 256;
    device.set_node_drops(NodeId::new(10), drops);

    let leaf = system.node_read_stats(PORT, NodeId::new(1)).unwrap();
    assert_eq!(leaf.class(), NodeClass::Leaf);
    assert_eq!(leaf.tx().map(|tx| (tx.packets, tx.bytes)), Some((12, 1500)));
    assert!(leaf.drops().is_none());

    let internal = system.node_read_stats(PORT, NodeId::new(10)).unwrap();
    assert_eq!(internal.class(), NodeClass::Internal);
    assert!(internal.tx().is_none());
    let red = internal.drops().unwrap().color(Color::Red);
    assert_eq!((red.packets, red.bytes), (4, 256));

    let err = system.node_read_stats(PORT, NodeId::new(99)).unwrap_err();
    assert_eq!(err.kind(), TmErrorKind::NotFound);
}

#[test]
fn test_shaper_rebind_and_profile_delete() {
    let (device, mut system) = setup(1);
    system
        .shaper_profile_create(PORT, &ShaperParams::new(ProfileId::new(1), 1000, 10))
        .unwrap();
    system
        .shaper_profile_create(
            PORT,
            &ShaperParams::new(ProfileId::new(2), 1000, 10).with_peak(4000, 10),
        )
        .unwrap();
    system
        .node_add(PORT, &NodeParams::root(NodeId::new(0)).with_profile(ProfileId::new(1)))
        .unwrap();

    let coloring = |system: &TmSystem| {
        *system
            .context(PORT)
            .unwrap()
            .tree()
            .get(NodeId::new(0))
            .unwrap()
            .drop_coloring()
    };
    assert_eq!(coloring(&system).get(Color::Red), Some(RedAlgorithm::Standard));

    let err = system
        .shaper_profile_delete(PORT, ProfileId::new(1))
        .unwrap_err();
    assert_eq!(err.kind(), TmErrorKind::InUse);

    system
        .node_shaper_update(PORT, NodeId::new(0), ProfileId::new(2))
        .unwrap();
    assert_eq!(coloring(&system).get(Color::Red), Some(RedAlgorithm::Discard));
    system.shaper_profile_delete(PORT, ProfileId::new(1)).unwrap();

    system
        .node_shaper_update(PORT, NodeId::new(0), ProfileId::INVALID)
        .unwrap();
    assert!(coloring(&system).is_empty());
    system.shaper_profile_delete(PORT, ProfileId::new(2)).unwrap();
    assert_eq!(device.profile_count(), 0);

    let err = system
        .shaper_profile_delete(PORT, ProfileId::new(2))
        .unwrap_err();
    assert_eq!(err.kind(), TmErrorKind::NotFound);
}

#[test]
fn test_unknown_interface() {
    let (_, mut system) = setup(1);
    let err = system
        .node_add(IfIndex::new(77), &NodeParams::root(NodeId::new(0)))
        .unwrap_err();
    assert_eq!(err.kind(), TmErrorKind::NotFound);
    assert!(err.to_string().contains("if77"));
}

#[test]
fn test_configured_limits() {
    let config = TmOrchConfig {
        max_nodes: 1,
        max_profiles: 1,
        ..TmOrchConfig::default()
    };
    let (_, mut system) = setup_with(1, config);
    system.node_add(PORT, &NodeParams::root(NodeId::new(0))).unwrap();
    system
        .shaper_profile_create(PORT, &ShaperParams::new(ProfileId::new(1), 1, 1))
        .unwrap();

    let err = system
        .node_add(PORT, &NodeParams::child(NodeId::new(1), NodeId::new(0)))
        .unwrap_err();
    assert_eq!(err.kind(), TmErrorKind::AllocationFailure);
    let err = system
        .shaper_profile_create(PORT, &ShaperParams::new(ProfileId::new(2), 1, 1))
        .unwrap_err();
    assert_eq!(err.kind(), TmErrorKind::AllocationFailure);
}

#[test]
fn test_hierarchy_file_applied() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
start = true

[device]
name = "Ethernet8"
tx_queues = 2

[[profiles]]
id = 1
commit_rate = 500

[[nodes]]
id = 10

[[nodes]]
id = 0
parent = 10
profile = 1

[[nodes]]
id = 1
parent = 10
"#
    )
    .unwrap();

    let hierarchy = HierarchyFile::load(file.path()).unwrap();
    let (_, mut system) = setup_with(hierarchy.device.tx_queues, hierarchy.orch.clone());
    for profile in &hierarchy.profiles {
        system.shaper_profile_create(PORT, &profile.to_params()).unwrap();
    }
    for node in &hierarchy.nodes {
        system.node_add(PORT, &node.to_params()).unwrap();
    }
    system.start_tm(PORT).unwrap();

    let snapshot = system.snapshot(PORT).unwrap();
    assert_eq!(snapshot.state, ActivationState::Active);
    assert_eq!(snapshot.leaf_count, 2);
    assert_eq!(snapshot.profiles[0].commit_rate, 4000);
    assert_eq!(snapshot.nodes.len(), 3);
    assert_eq!(snapshot.stats.nodes_added, 3);
}
