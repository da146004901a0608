//! Device status codes and error handling.
//!
//! This module converts raw device return codes into Rust's Result type
//! while keeping the device's own diagnostic text for logging.

use std::fmt;
use thiserror::Error;

/// Status codes returned by the traffic manager device layer.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceStatus {
    Success = 0,
    Failure = -1,
    NotSupported = -2,
    NoMemory = -3,
    InvalidParameter = -5,
    ItemAlreadyExists = -6,
    ItemNotFound = -7,
    TableFull = -13,
    ObjectInUse = -17,
    Busy = -25,
    Range = -26,
    Io = -27,
}

impl DeviceStatus {
    /// Creates a DeviceStatus from a raw i32 value.
    pub fn from_raw(status: i32) -> Self {
        match status {
            0 => DeviceStatus::Success,
            -1 => DeviceStatus::Failure,
            -2 => DeviceStatus::NotSupported,
            -3 => DeviceStatus::NoMemory,
            -5 => DeviceStatus::InvalidParameter,
            -6 => DeviceStatus::ItemAlreadyExists,
            -7 => DeviceStatus::ItemNotFound,
            -13 => DeviceStatus::TableFull,
            -17 => DeviceStatus::ObjectInUse,
            -25 => DeviceStatus::Busy,
            -26 => DeviceStatus::Range,
            -27 => DeviceStatus::Io,
            _ => DeviceStatus::Failure,
        }
    }

    /// Returns the raw status code.
    pub fn as_raw(&self) -> i32 {
        *self as i32
    }

    /// Returns true if the status indicates success.
    pub fn is_success(&self) -> bool {
        *self == DeviceStatus::Success
    }

    /// Converts to a Result, returning Ok(()) for success.
    pub fn into_result(self) -> DeviceResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(DeviceError::from_status(self))
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceStatus::Success => "TM_STATUS_SUCCESS",
            DeviceStatus::Failure => "TM_STATUS_FAILURE",
            DeviceStatus::NotSupported => "TM_STATUS_NOT_SUPPORTED",
            DeviceStatus::NoMemory => "TM_STATUS_NO_MEMORY",
            DeviceStatus::InvalidParameter => "TM_STATUS_INVALID_PARAMETER",
            DeviceStatus::ItemAlreadyExists => "TM_STATUS_ITEM_ALREADY_EXISTS",
            DeviceStatus::ItemNotFound => "TM_STATUS_ITEM_NOT_FOUND",
            DeviceStatus::TableFull => "TM_STATUS_TABLE_FULL",
            DeviceStatus::ObjectInUse => "TM_STATUS_OBJECT_IN_USE",
            DeviceStatus::Busy => "TM_STATUS_BUSY",
            DeviceStatus::Range => "TM_STATUS_RANGE",
            DeviceStatus::Io => "TM_STATUS_IO",
        };
        write!(f, "{}", s)
    }
}

/// Error reported by the device layer.
///
/// Keeps the classified status next to the device's diagnostic message so
/// callers can both branch on the status and log the original text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status} ({code}): {message}", code = .status.as_raw())]
pub struct DeviceError {
    status: DeviceStatus,
    message: String,
}

impl DeviceError {
    /// Creates an error with a status and diagnostic message.
    pub fn new(status: DeviceStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Creates an error from a status code alone.
    pub fn from_status(status: DeviceStatus) -> Self {
        let status = if status.is_success() {
            DeviceStatus::Failure
        } else {
            status
        };
        Self::new(status, "device returned an error status")
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(DeviceStatus::InvalidParameter, message)
    }

    /// Creates a not found error.
    pub fn not_found(item: impl Into<String>) -> Self {
        Self::new(DeviceStatus::ItemNotFound, item)
    }

    /// Creates an already exists error.
    pub fn already_exists(item: impl Into<String>) -> Self {
        Self::new(DeviceStatus::ItemAlreadyExists, item)
    }

    /// Creates an object in use error.
    pub fn object_in_use(object: impl Into<String>) -> Self {
        Self::new(DeviceStatus::ObjectInUse, object)
    }

    /// Returns the status code.
    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    /// Returns the device diagnostic text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if the device ran out of memory or table space.
    pub fn is_exhaustion(&self) -> bool {
        matches!(self.status, DeviceStatus::NoMemory | DeviceStatus::TableFull)
    }
}

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;
