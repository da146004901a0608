//! ShaperRegistry implementation.

use std::collections::BTreeMap;

use sonic_tm_device::{DeviceStatus, ProfileId, ShaperProfile, TmDevice};

use super::types::ShaperParams;
use crate::error::{TmError, TmResult};
use crate::{debug_log, warn_log};

/// Per-device table of shaper profiles in canonical units.
#[derive(Debug, Clone)]
pub struct ShaperRegistry {
    profiles: BTreeMap<ProfileId, ShaperProfile>,
    max_profiles: usize,
}

impl ShaperRegistry {
    /// Creates an empty registry holding at most `max_profiles` profiles.
    pub fn new(max_profiles: usize) -> Self {
        Self {
            profiles: BTreeMap::new(),
            max_profiles,
        }
    }

    /// Normalizes `params`, installs the profile on the device and records it.
    ///
    /// Nothing is recorded unless the device accepted the profile.
    pub fn create(&mut self, device: &dyn TmDevice, params: &ShaperParams) -> TmResult<ProfileId> {
        if self.profiles.contains_key(&params.id) {
            return Err(TmError::already_exists(format!("shaper profile {}", params.id)));
        }
        if self.profiles.len() >= self.max_profiles {
            return Err(TmError::allocation(
                "shaper profile",
                format!("registry full ({} profiles)", self.max_profiles),
            ));
        }

        let profile = params.normalize()?;

        if let Err(e) = device.profile_add(&profile) {
            warn_log!("ShaperRegistry", profile = profile.id.as_raw(), error = %e, "Device rejected shaper profile");
            return Err(TmError::allocation(
                format!("shaper profile {}", profile.id),
                format!("shaper profile add - device error: {}", e),
            ));
        }

        debug_log!(
            "ShaperRegistry",
            profile = profile.id.as_raw(),
            commit_rate = profile.commit_rate,
            peak_rate = profile.peak_rate,
            "Shaper profile created"
        );
        let id = profile.id;
        self.profiles.insert(id, profile);
        Ok(id)
    }

    /// Removes a profile from the device and the registry.
    pub fn delete(&mut self, device: &dyn TmDevice, id: ProfileId) -> TmResult<()> {
        if !self.profiles.contains_key(&id) {
            return Err(TmError::not_found(format!("shaper profile {}", id)));
        }

        device.profile_delete(id).map_err(|e| {
            if e.status() == DeviceStatus::ObjectInUse {
                TmError::InUse {
                    object: format!("shaper profile {}", id),
                    message: e.to_string(),
                }
            } else {
                TmError::rejected("shaper profile delete", e)
            }
        })?;

        self.profiles.remove(&id);
        debug_log!("ShaperRegistry", profile = id.as_raw(), "Shaper profile deleted");
        Ok(())
    }

    /// Returns a profile or `NotFound`.
    pub fn get(&self, id: ProfileId) -> TmResult<&ShaperProfile> {
        self.lookup(id)
            .ok_or_else(|| TmError::not_found(format!("shaper profile {}", id)))
    }

    /// Returns a profile if it is registered.
    pub fn lookup(&self, id: ProfileId) -> Option<&ShaperProfile> {
        self.profiles.get(&id)
    }

    /// Returns true if the profile is registered.
    pub fn contains(&self, id: ProfileId) -> bool {
        self.profiles.contains_key(&id)
    }

    /// Iterates over the profiles in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ShaperProfile> {
        self.profiles.values()
    }

    /// Returns the number of profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns true if no profile is registered.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TmErrorKind;
    use pretty_assertions::assert_eq;
    use sonic_tm_device::{Level, NodeDescriptor, NodeId, SimDevice, SimOp};

    fn params(id: u32, rate: u64) -> ShaperParams {
        ShaperParams::new(ProfileId::new(id), rate, 100)
    }

    #[test]
    fn test_create_and_get() {
        let device = SimDevice::new(1);
        let mut registry = ShaperRegistry::new(8);

        let id = registry.create(&device, &params(1, 1000)).unwrap();
        assert_eq!(id, ProfileId::new(1));
        assert_eq!(registry.get(id).unwrap().commit_rate, 8000);
        assert_eq!(device.profile_get(id).unwrap().commit_rate, 8000);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_create_duplicate() {
        let device = SimDevice::new(1);
        let mut registry = ShaperRegistry::new(8);
        registry.create(&device, &params(1, 1000)).unwrap();

        let err = registry.create(&device, &params(1, 2000)).unwrap_err();
        assert_eq!(err.kind(), TmErrorKind::AlreadyExists);
        assert_eq!(registry.get(ProfileId::new(1)).unwrap().commit_rate, 8000);
    }

    #[test]
    fn test_create_rejected_not_retained() {
        let device = SimDevice::new(1);
        device.fail_next(SimOp::ProfileAdd, DeviceStatus::NoMemory);
        let mut registry = ShaperRegistry::new(8);

        let err = registry.create(&device, &params(1, 1000)).unwrap_err();
        assert_eq!(err.kind(), TmErrorKind::AllocationFailure);
        assert!(err.to_string().contains("TM_STATUS_NO_MEMORY"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_create_invalid_parameter_keeps_device_text() {
        let device = SimDevice::new(1);
        let mut registry = ShaperRegistry::new(8);
        let bad = ShaperParams::new(ProfileId::new(3), 2000, 10).with_peak(1000, 10);

        let err = registry.create(&device, &bad).unwrap_err();
        assert_eq!(err.kind(), TmErrorKind::AllocationFailure);
        let text = err.to_string();
        assert!(text.contains("TM_STATUS_INVALID_PARAMETER"), "{}", text);
        assert!(text.contains("peak rate 8000 below commit rate 16000"), "{}", text);
        assert!(registry.get(ProfileId::new(3)).is_err());
        assert_eq!(device.profile_count(), 0);
    }

    #[test]
    fn test_create_capacity() {
        let device = SimDevice::new(1);
        let mut registry = ShaperRegistry::new(1);
        registry.create(&device, &params(1, 1000)).unwrap();

        let err = registry.create(&device, &params(2, 1000)).unwrap_err();
        assert_eq!(err.kind(), TmErrorKind::AllocationFailure);
        assert_eq!(device.profile_count(), 1);
    }

    #[test]
    fn test_delete() {
        let device = SimDevice::new(1);
        let mut registry = ShaperRegistry::new(8);
        registry.create(&device, &params(1, 1000)).unwrap();

        registry.delete(&device, ProfileId::new(1)).unwrap();
        assert!(registry.is_empty());

        let err = registry.delete(&device, ProfileId::new(1)).unwrap_err();
        assert_eq!(err.kind(), TmErrorKind::NotFound);
    }

    #[test]
    fn test_delete_in_use() {
        let device = SimDevice::new(1);
        let mut registry = ShaperRegistry::new(8);
        registry.create(&device, &params(1, 1000)).unwrap();
        device
            .node_add(&NodeDescriptor {
                id: NodeId::new(0),
                parent: None,
                level: Level::ROOT,
                priority: 0,
                weight: 1,
                shaper_profile: Some(ProfileId::new(1)),
            })
            .unwrap();

        let err = registry.delete(&device, ProfileId::new(1)).unwrap_err();
        assert_eq!(err.kind(), TmErrorKind::InUse);
        assert!(registry.contains(ProfileId::new(1)));
    }

    #[test]
    fn test_delete_rejected() {
        let device = SimDevice::new(1);
        let mut registry = ShaperRegistry::new(8);
        registry.create(&device, &params(1, 1000)).unwrap();
        device.fail_next(SimOp::ProfileDelete, DeviceStatus::Busy);

        let err = registry.delete(&device, ProfileId::new(1)).unwrap_err();
        assert_eq!(err.kind(), TmErrorKind::HardwareRejected);
        assert!(registry.contains(ProfileId::new(1)));
    }
}
