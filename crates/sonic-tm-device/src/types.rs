//! Type-safe traffic manager identifiers and descriptors.
//!
//! Node, shaper profile and queue identifiers all share the same `u32`
//! representation on the device. The wrappers in this module tag each id
//! with its object kind so a profile id can never be handed to an API that
//! expects a node id.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Raw identifier type used by the device for nodes, profiles and queues.
pub type RawTmObjectId = u32;

/// Marker trait for traffic manager object kinds.
pub trait TmObjectKind: Send + Sync + 'static {
    /// Returns the object type name for debugging.
    fn type_name() -> &'static str;
}

/// A type-safe traffic manager object id.
///
/// The phantom type parameter `T` records what kind of object this id
/// refers to. The all-ones value is reserved as the "invalid" sentinel
/// (no parent, no shaper profile).
///
/// # Examples
///
/// ```
/// use sonic_tm_device::{NodeId, ProfileId};
///
/// let node = NodeId::new(7);
/// let profile = ProfileId::new(7);
///
/// assert!(node.is_valid());
/// assert_eq!(node.as_raw(), profile.as_raw());
/// // fn takes_node(n: NodeId) {}
/// // takes_node(profile); // Error: expected NodeId, found ProfileId
/// ```
#[derive(Clone, Copy)]
pub struct TmObjectId<T: TmObjectKind> {
    raw: RawTmObjectId,
    _marker: PhantomData<T>,
}

impl<T: TmObjectKind> TmObjectId<T> {
    /// The reserved invalid id.
    pub const INVALID: Self = Self {
        raw: RawTmObjectId::MAX,
        _marker: PhantomData,
    };

    /// Creates an id from a raw value, including the invalid sentinel.
    pub const fn new(raw: RawTmObjectId) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Creates an id from a raw value.
    ///
    /// Returns `None` for the invalid sentinel.
    pub const fn from_raw(raw: RawTmObjectId) -> Option<Self> {
        if raw == RawTmObjectId::MAX {
            None
        } else {
            Some(Self::new(raw))
        }
    }

    /// Returns the raw id value.
    pub const fn as_raw(&self) -> RawTmObjectId {
        self.raw
    }

    /// Returns true if this is not the invalid sentinel.
    pub const fn is_valid(&self) -> bool {
        self.raw != RawTmObjectId::MAX
    }
}

impl<T: TmObjectKind> fmt::Debug for TmObjectId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}({})", T::type_name(), self.raw)
        } else {
            write!(f, "{}(INVALID)", T::type_name())
        }
    }
}

impl<T: TmObjectKind> fmt::Display for TmObjectId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl<T: TmObjectKind> PartialEq for TmObjectId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T: TmObjectKind> Eq for TmObjectId<T> {}

impl<T: TmObjectKind> PartialOrd for TmObjectId<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: TmObjectKind> Ord for TmObjectId<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T: TmObjectKind> Hash for TmObjectId<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T: TmObjectKind> Default for TmObjectId<T> {
    fn default() -> Self {
        Self::INVALID
    }
}

macro_rules! define_object_kind {
    ($name:ident, $type_name:literal, $id_alias:ident) => {
        #[doc = concat!("Marker type for ", $type_name, " objects.")]
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl TmObjectKind for $name {
            fn type_name() -> &'static str {
                $type_name
            }
        }

        #[doc = concat!("Type alias for ", $type_name, " ids.")]
        pub type $id_alias = TmObjectId<$name>;
    };
}

define_object_kind!(NodeKind, "Node", NodeId);
define_object_kind!(ProfileKind, "ShaperProfile", ProfileId);
define_object_kind!(QueueKind, "TxQueue", QueueId);

/// Hierarchy level. The root sits at [`Level::ROOT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Level(u32);

impl Level {
    /// The level reserved for the hierarchy root.
    pub const ROOT: Self = Level(0);

    /// Creates a level from its raw value.
    pub const fn new(level: u32) -> Self {
        Level(level)
    }

    /// Returns the raw level value.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns true for the root level.
    pub const fn is_root(&self) -> bool {
        self.0 == Self::ROOT.0
    }

    /// Returns the level directly below this one.
    pub const fn next(&self) -> Self {
        Level(self.0.saturating_add(1))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque hardware interface handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IfIndex(u32);

impl IfIndex {
    /// Creates an interface handle from its raw index.
    pub const fn new(index: u32) -> Self {
        IfIndex(index)
    }

    /// Returns the raw interface index.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for IfIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if{}", self.0)
    }
}

/// Packet color assigned by the rate meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// Within the committed rate.
    Green,
    /// Above commit, within peak.
    Yellow,
    /// Above the peak rate.
    Red,
}

impl Color {
    /// Number of colors.
    pub const COUNT: usize = 3;

    /// All colors, in counter index order.
    pub const ALL: [Color; Color::COUNT] = [Color::Green, Color::Yellow, Color::Red];

    /// Returns the counter index of this color.
    pub const fn index(&self) -> usize {
        match self {
            Self::Green => 0,
            Self::Yellow => 1,
            Self::Red => 2,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "green" => Ok(Self::Green),
            "yellow" => Ok(Self::Yellow),
            "red" => Ok(Self::Red),
            _ => Err(format!("Unknown color: {}", s)),
        }
    }
}

/// Hierarchy flavour requested when enabling the traffic manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HierarchyMode {
    /// Device default hierarchy.
    #[default]
    Default,
    /// Device rate-limit hierarchy.
    RateLimit,
    /// Hierarchy built node by node by the controller.
    User,
}

/// Shaper profile in canonical units.
///
/// Rates are bits per second and bursts are bits unless `pkt_mode` is set,
/// in which case both are expressed in packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaperProfile {
    /// Profile id.
    pub id: ProfileId,
    /// Committed rate.
    pub commit_rate: u64,
    /// Committed burst size.
    pub commit_burst: u64,
    /// Peak rate.
    pub peak_rate: u64,
    /// Peak burst size.
    pub peak_burst: u64,
    /// Signed adjustment applied to the measured packet length.
    pub pkt_len_adj: i32,
    /// True when the profile meters packets instead of bytes.
    pub pkt_mode: bool,
}

impl ShaperProfile {
    /// Returns true when both committed and peak rates are shaped.
    pub fn is_dual_rate(&self) -> bool {
        self.commit_rate > 0 && self.peak_rate > 0
    }
}

/// Node record handed to the device when a node is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    /// Node id.
    pub id: NodeId,
    /// Parent node, `None` for the root.
    pub parent: Option<NodeId>,
    /// Effective hierarchy level.
    pub level: Level,
    /// Strict priority among siblings.
    pub priority: u32,
    /// Weight among siblings of equal priority.
    pub weight: u32,
    /// Bound shaper profile.
    pub shaper_profile: Option<ProfileId>,
}

/// Transmit counters of a hardware queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    /// Packets transmitted.
    pub tx_packets: u64,
    /// Octets transmitted.
    pub tx_bytes: u64,
}

/// Drop counters of a scheduling node, indexed by [`Color::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeDropStats {
    /// Packets dropped per color.
    pub packets: [u64; Color::COUNT],
    /// Octets dropped per color.
    pub bytes: [u64; Color::COUNT],
}

impl NodeDropStats {
    /// Returns the dropped packets for a color.
    pub fn packets(&self, color: Color) -> u64 {
        self.packets[color.index()]
    }

    /// Returns the dropped bytes for a color.
    pub fn bytes(&self, color: Color) -> u64 {
        self.bytes[color.index()]
    }
}
