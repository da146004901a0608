//! Error types for traffic manager operations.
//!
//! Every failure returned by the controller carries a stable
//! [`TmErrorKind`] and a human-readable message. Failures reported by the
//! device layer keep the original [`DeviceError`] as their source so the
//! driver's diagnostic text reaches the logs unchanged.

use std::fmt;

use serde::Serialize;
use sonic_tm_device::DeviceError;
use thiserror::Error;

/// Result type alias for traffic manager operations.
pub type TmResult<T> = Result<T, TmError>;

/// Stable classification of a [`TmError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TmErrorKind {
    NotFound,
    AlreadyExists,
    InvalidParent,
    InvalidArgument,
    HierarchyLocked,
    IncompleteHierarchy,
    AllocationFailure,
    InUse,
    HardwareRejected,
    Internal,
}

impl TmErrorKind {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::InvalidParent => "invalid_parent",
            Self::InvalidArgument => "invalid_argument",
            Self::HierarchyLocked => "hierarchy_locked",
            Self::IncompleteHierarchy => "incomplete_hierarchy",
            Self::AllocationFailure => "allocation_failure",
            Self::InUse => "in_use",
            Self::HardwareRejected => "hardware_rejected",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for TmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while managing a traffic manager hierarchy.
#[derive(Debug, Clone, Error)]
pub enum TmError {
    /// Referenced node, profile or interface does not exist.
    #[error("{object} not found")]
    NotFound {
        /// The missing object, e.g. "node 3".
        object: String,
    },

    /// Duplicate id on creation.
    #[error("{object} already exists")]
    AlreadyExists {
        /// The duplicate object.
        object: String,
    },

    /// Neither a valid parent reference nor a valid root declaration.
    #[error("Invalid parent for node {node}: {message}")]
    InvalidParent {
        /// The node being added.
        node: u32,
        /// Why the placement was refused.
        message: String,
    },

    /// Malformed input.
    #[error("Invalid argument {field}: {message}")]
    InvalidArgument {
        /// The offending argument.
        field: String,
        /// Error message.
        message: String,
    },

    /// Mutation attempted while the hierarchy is active.
    #[error("Cannot {operation}: hierarchy is active")]
    HierarchyLocked {
        /// The refused operation.
        operation: String,
    },

    /// Activation attempted without one leaf per transmit queue.
    #[error("Hierarchy incomplete: {leaf_count} leaf node(s) for {tx_queues} tx queue(s)")]
    IncompleteHierarchy {
        /// Leaves currently in the tree.
        leaf_count: usize,
        /// Transmit queues configured on the device.
        tx_queues: u32,
    },

    /// Local bookkeeping or device resources exhausted.
    #[error("Allocation failed for {resource}: {message}")]
    AllocationFailure {
        /// The resource being allocated.
        resource: String,
        /// Error message.
        message: String,
    },

    /// Object still referenced.
    #[error("{object} is in use: {message}")]
    InUse {
        /// The referenced object.
        object: String,
        /// Device diagnostic.
        message: String,
    },

    /// The device layer declined the operation.
    #[error("{operation} - device error: {source}")]
    HardwareRejected {
        /// The operation that was rejected.
        operation: String,
        /// The device error.
        #[source]
        source: DeviceError,
    },

    /// Local and device state diverged.
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl TmError {
    /// Creates a not found error.
    pub fn not_found(object: impl Into<String>) -> Self {
        Self::NotFound {
            object: object.into(),
        }
    }

    /// Creates an already exists error.
    pub fn already_exists(object: impl Into<String>) -> Self {
        Self::AlreadyExists {
            object: object.into(),
        }
    }

    /// Creates an invalid parent error.
    pub fn invalid_parent(node: u32, message: impl Into<String>) -> Self {
        Self::InvalidParent {
            node,
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a hierarchy locked error.
    pub fn locked(operation: impl Into<String>) -> Self {
        Self::HierarchyLocked {
            operation: operation.into(),
        }
    }

    /// Creates an allocation failure error.
    pub fn allocation(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AllocationFailure {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Creates a hardware rejected error.
    pub fn rejected(operation: impl Into<String>, source: DeviceError) -> Self {
        Self::HardwareRejected {
            operation: operation.into(),
            source,
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classifies a device failure on a path that allocates device resources.
    ///
    /// Exhaustion becomes [`TmErrorKind::AllocationFailure`], anything else
    /// [`TmErrorKind::HardwareRejected`].
    pub fn from_device_alloc(
        operation: impl Into<String>,
        resource: impl Into<String>,
        err: DeviceError,
    ) -> Self {
        if err.is_exhaustion() {
            Self::allocation(resource, err.to_string())
        } else {
            Self::rejected(operation, err)
        }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> TmErrorKind {
        match self {
            Self::NotFound { .. } => TmErrorKind::NotFound,
            Self::AlreadyExists { .. } => TmErrorKind::AlreadyExists,
            Self::InvalidParent { .. } => TmErrorKind::InvalidParent,
            Self::InvalidArgument { .. } => TmErrorKind::InvalidArgument,
            Self::HierarchyLocked { .. } => TmErrorKind::HierarchyLocked,
            Self::IncompleteHierarchy { .. } => TmErrorKind::IncompleteHierarchy,
            Self::AllocationFailure { .. } => TmErrorKind::AllocationFailure,
            Self::InUse { .. } => TmErrorKind::InUse,
            Self::HardwareRejected { .. } => TmErrorKind::HardwareRejected,
            Self::Internal { .. } => TmErrorKind::Internal,
        }
    }

    /// Returns the device error behind this failure, if any.
    pub fn device_error(&self) -> Option<&DeviceError> {
        match self {
            Self::HardwareRejected { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_tm_device::DeviceStatus;
    use std::error::Error as _;

    #[test]
    fn test_kind() {
        assert_eq!(TmError::not_found("node 3").kind(), TmErrorKind::NotFound);
        assert_eq!(TmError::locked("add node").kind(), TmErrorKind::HierarchyLocked);
        assert_eq!(
            TmError::IncompleteHierarchy {
                leaf_count: 1,
                tx_queues: 2
            }
            .kind(),
            TmErrorKind::IncompleteHierarchy
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(TmError::not_found("node 3").to_string(), "node 3 not found");
        assert_eq!(
            TmError::locked("add node").to_string(),
            "Cannot add node: hierarchy is active"
        );
        assert_eq!(TmErrorKind::HardwareRejected.to_string(), "hardware_rejected");
    }

    #[test]
    fn test_rejected_keeps_device_text() {
        let err = TmError::rejected(
            "node add",
            DeviceError::new(DeviceStatus::Busy, "scheduler busy"),
        );
        assert_eq!(
            err.to_string(),
            "node add - device error: TM_STATUS_BUSY (-25): scheduler busy"
        );
        assert!(err.source().is_some());
        assert_eq!(err.device_error().map(|e| e.status()), Some(DeviceStatus::Busy));
    }

    #[test]
    fn test_alloc_classification() {
        let err = TmError::from_device_alloc(
            "node add",
            "tm node",
            DeviceError::new(DeviceStatus::TableFull, "no free scheduler"),
        );
        assert_eq!(err.kind(), TmErrorKind::AllocationFailure);
        assert!(err.to_string().contains("no free scheduler"));

        let err = TmError::from_device_alloc(
            "node add",
            "tm node",
            DeviceError::invalid_parameter("bad weight"),
        );
        assert_eq!(err.kind(), TmErrorKind::HardwareRejected);
    }
}
