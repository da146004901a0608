//! Configuration for tmorch.
//!
//! [`TmOrchConfig`] tunes the controller. [`HierarchyFile`] is a TOML
//! description of a whole hierarchy (device, profiles, nodes) applied by
//! the `tmorch` binary.
//!
//! ```toml
//! start = true
//!
//! [orch]
//! max_nodes = 256
//!
//! [orch.drop_coloring]
//! colors = ["red"]
//!
//! [device]
//! name = "eth0"
//! tx_queues = 1
//!
//! [[profiles]]
//! id = 1
//! commit_rate = 1000
//!
//! [[nodes]]
//! id = 0
//!
//! [[nodes]]
//! id = 1
//! parent = 0
//! profile = 1
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sonic_tm_device::{Level, NodeId, ProfileId, RawTmObjectId};
use thiserror::Error;

use crate::binding::DropColoringPolicy;
use crate::hierarchy::NodeParams;
use crate::shaper::ShaperParams;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        /// The file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse config: {source}")]
    Parse {
        /// The TOML error.
        #[from]
        source: toml::de::Error,
    },

    /// A value failed validation.
    #[error("Invalid configuration for {field}: {message}")]
    Invalid {
        /// The offending field.
        field: String,
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmOrchConfig {
    /// Maximum nodes per hierarchy
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,

    /// Maximum shaper profiles per device
    #[serde(default = "default_max_profiles")]
    pub max_profiles: usize,

    /// Reset internal node drop counters after each read
    #[serde(default)]
    pub clear_stats_on_read: bool,

    /// Drop-coloring defaults derived from shaper profiles
    #[serde(default)]
    pub drop_coloring: DropColoringPolicy,
}

fn default_max_nodes() -> usize {
    4096
}

fn default_max_profiles() -> usize {
    1024
}

impl Default for TmOrchConfig {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
            max_profiles: default_max_profiles(),
            clear_stats_on_read: false,
            drop_coloring: DropColoringPolicy::default(),
        }
    }
}

impl TmOrchConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nodes == 0 {
            return Err(ConfigError::invalid("max_nodes", "must be > 0"));
        }
        if self.max_profiles == 0 {
            return Err(ConfigError::invalid("max_profiles", "must be > 0"));
        }
        Ok(())
    }
}

/// Device section of a hierarchy file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSection {
    /// Device name used in logs
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Transmit queues configured on the port
    pub tx_queues: u32,
}

fn default_device_name() -> String {
    "tm0".to_string()
}

/// A shaper profile entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub id: RawTmObjectId,
    #[serde(default)]
    pub commit_rate: u64,
    #[serde(default)]
    pub commit_burst: u64,
    #[serde(default)]
    pub peak_rate: u64,
    #[serde(default)]
    pub peak_burst: u64,
    #[serde(default)]
    pub pkt_len_adj: i32,
    #[serde(default)]
    pub pkt_mode: bool,
}

impl ProfileEntry {
    /// Converts the entry into a create request.
    pub fn to_params(&self) -> ShaperParams {
        ShaperParams {
            id: ProfileId::new(self.id),
            commit_rate: self.commit_rate,
            commit_burst: self.commit_burst,
            peak_rate: self.peak_rate,
            peak_burst: self.peak_burst,
            pkt_len_adj: self.pkt_len_adj,
            pkt_mode: self.pkt_mode,
        }
    }
}

/// A node entry. Nodes without `parent` declare the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub id: RawTmObjectId,
    #[serde(default)]
    pub parent: Option<RawTmObjectId>,
    #[serde(default)]
    pub priority: u32,
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Requested level; derived from the parent when omitted
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub profile: Option<RawTmObjectId>,
}

fn default_weight() -> u32 {
    1
}

impl NodeEntry {
    /// Converts the entry into a node add request.
    pub fn to_params(&self) -> NodeParams {
        let parent = self.parent.map(NodeId::new);
        let level = match (self.level, parent) {
            (Some(level), _) => Level::new(level),
            (None, Some(_)) => Level::ROOT.next(),
            (None, None) => Level::ROOT,
        };
        NodeParams {
            id: NodeId::new(self.id),
            parent,
            priority: self.priority,
            weight: self.weight,
            level,
            shaper_profile: self.profile.map(ProfileId::new),
        }
    }
}

/// A hierarchy description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyFile {
    /// Controller configuration
    #[serde(default)]
    pub orch: TmOrchConfig,

    /// Target device
    pub device: DeviceSection,

    /// Profiles, created in order
    #[serde(default)]
    pub profiles: Vec<ProfileEntry>,

    /// Nodes, added in order
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,

    /// Activate the hierarchy once built
    #[serde(default)]
    pub start: bool,
}

impl HierarchyFile {
    /// Loads and validates a hierarchy file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates a hierarchy description.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: Self = toml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.orch.validate()?;
        if self.device.name.is_empty() {
            return Err(ConfigError::invalid("device.name", "must not be empty"));
        }
        Ok(())
    }
}
