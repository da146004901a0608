//! Hierarchy activation state machine.
//!
//! ```text
//!            start (leaf_count >= tx_queues)
//! Inactive ----------------------------------> Active
//!    ^                                           |
//!    +------------------- stop ------------------+
//! ```
//!
//! Structural mutation is only allowed while inactive. `stop` may be
//! called from either state.

use std::fmt;

use serde::Serialize;
use sonic_tm_device::{HierarchyMode, TmDevice};

use crate::error::{TmError, TmResult};
use crate::info_log;

/// Activation state of a hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationState {
    #[default]
    Inactive,
    Active,
}

impl ActivationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns the activation state of one device's hierarchy.
#[derive(Debug, Clone, Default)]
pub struct LifecycleController {
    state: ActivationState,
}

impl LifecycleController {
    /// Creates a controller in `state`.
    pub fn new(state: ActivationState) -> Self {
        Self { state }
    }

    /// Creates a controller mirroring the device's current hierarchy state.
    pub fn from_device(device: &dyn TmDevice) -> Self {
        if device.hierarchy_enabled() {
            Self::new(ActivationState::Active)
        } else {
            Self::new(ActivationState::Inactive)
        }
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ActivationState::Active
    }

    /// Fails with `HierarchyLocked` while the hierarchy is active.
    pub fn ensure_mutable(&self, operation: &str) -> TmResult<()> {
        if self.is_active() {
            return Err(TmError::locked(operation));
        }
        Ok(())
    }

    /// Activates the hierarchy.
    ///
    /// The device hierarchy is always disabled before the user hierarchy is
    /// enabled with an immediate commit. The state only changes once both
    /// calls succeeded.
    pub fn start(
        &mut self,
        device: &dyn TmDevice,
        leaf_count: usize,
        tx_queues: u32,
    ) -> TmResult<()> {
        if self.is_active() {
            return Err(TmError::locked("start hierarchy (already active)"));
        }
        if leaf_count < tx_queues as usize {
            return Err(TmError::IncompleteHierarchy {
                leaf_count,
                tx_queues,
            });
        }

        device
            .hierarchy_disable()
            .map_err(|e| TmError::rejected("hierarchy disable", e))?;
        device
            .hierarchy_enable(HierarchyMode::User, true)
            .map_err(|e| TmError::rejected("hierarchy enable", e))?;

        self.state = ActivationState::Active;
        info_log!("LifecycleController", leaf_count, tx_queues, "Hierarchy activated");
        Ok(())
    }

    /// Deactivates the hierarchy. Idempotent.
    pub fn stop(&mut self, device: &dyn TmDevice) -> TmResult<()> {
        device
            .hierarchy_disable()
            .map_err(|e| TmError::internal(format!("hierarchy disable failed: {}", e)))?;

        self.state = ActivationState::Inactive;
        info_log!("LifecycleController", "Hierarchy deactivated");
        Ok(())
    }
}
