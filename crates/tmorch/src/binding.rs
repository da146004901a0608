//! Shaper binding and drop-coloring defaults.
//!
//! Whenever a node gets a shaper profile (at creation or through a rebind)
//! its RED drop-coloring defaults are recomputed from that profile. Both
//! paths go through [`DefaultsEngine::apply`].

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use sonic_tm_device::{Color, NodeId, ProfileId, ShaperProfile, TmDevice};

use crate::error::{TmError, TmResult};
use crate::hierarchy::HierarchyTree;
use crate::shaper::ShaperRegistry;
use crate::{debug_log, error_log, warn_log};

/// RED algorithm applied to a packet color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedAlgorithm {
    /// Standard RED marking.
    #[default]
    Standard,
    /// Drop instead of marking.
    Discard,
}

impl RedAlgorithm {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Discard => "discard",
        }
    }
}

impl fmt::Display for RedAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RedAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "discard" => Ok(Self::Discard),
            _ => Err(format!("Unknown RED algorithm: {}", s)),
        }
    }
}

/// Per-color RED algorithms of a node. Colors without an entry are not
/// colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DropColoring {
    algorithms: [Option<RedAlgorithm>; Color::COUNT],
}

impl DropColoring {
    /// Returns the algorithm applied to `color`.
    pub fn get(&self, color: Color) -> Option<RedAlgorithm> {
        self.algorithms[color.index()]
    }

    /// Returns true when no color is configured.
    pub fn is_empty(&self) -> bool {
        self.algorithms.iter().all(Option::is_none)
    }

    fn set(&mut self, color: Color, algorithm: RedAlgorithm) {
        self.algorithms[color.index()] = Some(algorithm);
    }
}

impl Serialize for DropColoring {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for color in Color::ALL {
            if let Some(algorithm) = self.get(color) {
                map.serialize_entry(color.as_str(), &algorithm)?;
            }
        }
        map.end()
    }
}

/// Which colors receive a derived RED default, and which algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropColoringPolicy {
    /// Colors that receive the default.
    #[serde(default = "default_colors", with = "color_list")]
    pub colors: Vec<Color>,

    /// Algorithm for single-rate profiles.
    #[serde(default)]
    pub single_rate: RedAlgorithm,

    /// Algorithm for dual-rate profiles.
    #[serde(default = "default_dual_rate")]
    pub dual_rate: RedAlgorithm,
}

fn default_colors() -> Vec<Color> {
    vec![Color::Red]
}

fn default_dual_rate() -> RedAlgorithm {
    RedAlgorithm::Discard
}

impl Default for DropColoringPolicy {
    fn default() -> Self {
        Self {
            colors: default_colors(),
            single_rate: RedAlgorithm::default(),
            dual_rate: default_dual_rate(),
        }
    }
}

mod color_list {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use sonic_tm_device::Color;

    pub fn serialize<S: Serializer>(colors: &[Color], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(colors.iter().map(Color::as_str))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Color>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|name| name.parse().map_err(D::Error::custom))
            .collect()
    }
}

/// Derives drop-coloring defaults and binds shapers to nodes.
#[derive(Debug, Clone, Default)]
pub struct DefaultsEngine {
    policy: DropColoringPolicy,
}

impl DefaultsEngine {
    /// Creates an engine applying `policy`.
    pub fn new(policy: DropColoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DropColoringPolicy {
        &self.policy
    }

    /// Computes the coloring for a node bound to `profile`.
    ///
    /// No profile clears the coloring. A dual-rate profile gets the
    /// policy's dual-rate algorithm, anything else the single-rate one.
    pub fn derive(&self, profile: Option<&ShaperProfile>) -> DropColoring {
        let mut coloring = DropColoring::default();
        let Some(profile) = profile else {
            return coloring;
        };
        let algorithm = if profile.is_dual_rate() {
            self.policy.dual_rate
        } else {
            self.policy.single_rate
        };
        for color in &self.policy.colors {
            coloring.set(*color, algorithm);
        }
        coloring
    }

    /// Recomputes and stores the coloring of `node`.
    pub fn apply(
        &self,
        tree: &mut HierarchyTree,
        node: NodeId,
        profile: Option<&ShaperProfile>,
    ) -> TmResult<DropColoring> {
        let coloring = self.derive(profile);
        let entry = tree
            .get_mut(node)
            .ok_or_else(|| TmError::internal(format!("node {} vanished before coloring", node)))?;
        entry.drop_coloring = coloring;
        debug_log!(
            "DefaultsEngine",
            node = node.as_raw(),
            colored = !coloring.is_empty(),
            "Drop coloring defaults applied"
        );
        Ok(coloring)
    }

    /// Rebinds the shaper of `node` to `profile`.
    ///
    /// The device is updated first. [`ProfileId::INVALID`] detaches the
    /// shaper and clears the coloring.
    pub fn bind_shaper(
        &self,
        device: &dyn TmDevice,
        tree: &mut HierarchyTree,
        registry: &ShaperRegistry,
        node: NodeId,
        profile: ProfileId,
    ) -> TmResult<DropColoring> {
        device
            .node_shaper_update(node, profile, false)
            .map_err(|e| TmError::rejected("node shaper update", e))?;

        let Some(entry) = tree.get_mut(node) else {
            error_log!(
                "DefaultsEngine",
                node = node.as_raw(),
                "Device updated the shaper of a node missing from the hierarchy"
            );
            return Err(TmError::internal(format!(
                "node {} not found after shaper update",
                node
            )));
        };

        let resolved = if profile.is_valid() {
            match registry.lookup(profile) {
                Some(resolved) => Some(resolved),
                None => {
                    warn_log!(
                        "DefaultsEngine",
                        node = node.as_raw(),
                        profile = profile.as_raw(),
                        "Device accepted a shaper profile unknown to the registry"
                    );
                    return Err(TmError::not_found(format!("shaper profile {}", profile)));
                }
            }
        } else {
            None
        };

        entry.shaper_profile = resolved.map(|p| p.id);
        self.apply(tree, node, resolved)
    }
}
