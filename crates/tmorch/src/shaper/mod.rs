//! Shaper profile registry.
//!
//! Profiles are named rate-limiting descriptors. Nodes reference them by id
//! only; whether a profile is still referenced is decided by the device
//! when it is deleted.

mod registry;
mod types;

pub use registry::ShaperRegistry;
pub use types::{ShaperParams, BITS_PER_BYTE};
