use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::domain::{Device, DeviceId};
use crate::error::{MonitorError, MonitorResult};

/// Concurrent map of device records.
///
/// Lists hand out cloned snapshots, never live views, so callers can
/// iterate while category loops keep mutating. Runtime fields of a device
/// are only written through [`DeviceRegistry::with_device_mut`] by the task
/// executor holding the task's running flag.
pub struct DeviceRegistry {
    devices: RwLock<HashMap<DeviceId, Device>>,
    next_id: AtomicU64,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Insert a device, assigning an id when the record carries none.
    /// Re-adding an existing id replaces the stored record (idempotent).
    pub fn add(&self, mut device: Device) -> DeviceId {
        if device.id.is_empty() {
            let n = self.next_id.fetch_add(1, Ordering::Relaxed);
            device.id = DeviceId::new(format!("dev-{n}"));
        }
        let id = device.id.clone();
        self.devices.write().unwrap().insert(id.clone(), device);
        id
    }

    /// Remove a device and return the stored record so the caller can
    /// tear down any open session.
    pub fn remove(&self, id: &DeviceId) -> MonitorResult<Device> {
        self.devices
            .write()
            .unwrap()
            .remove(id)
            .ok_or_else(|| MonitorError::NotFound(id.to_string()))
    }

    /// Replace the stored record, carrying runtime fields over from the
    /// previous one so an in-flight run's write-back lands on live state.
    pub fn update(&self, device: Device) -> MonitorResult<()> {
        let mut devices = self.devices.write().unwrap();
        match devices.get(&device.id) {
            Some(prev) => {
                let merged = device.with_runtime_of(prev);
                devices.insert(merged.id.clone(), merged);
                Ok(())
            }
            None => Err(MonitorError::NotFound(device.id.to_string())),
        }
    }

    pub fn get(&self, id: &DeviceId) -> Option<Device> {
        self.devices.read().unwrap().get(id).cloned()
    }

    /// Snapshot of all devices (copies, not a live view)
    pub fn list(&self) -> Vec<Device> {
        self.devices.read().unwrap().values().cloned().collect()
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.read().unwrap().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.devices.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutate one device in place. Returns None when the id is unknown,
    /// e.g. because the device was removed while its last run was in
    /// flight; the caller treats that as a no-op.
    pub fn with_device_mut<R>(&self, id: &DeviceId, f: impl FnOnce(&mut Device) -> R) -> Option<R> {
        let mut devices = self.devices.write().unwrap();
        devices.get_mut(id).map(f)
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectionKind, DeviceStatus};

    fn device(id: &str) -> Device {
        Device::new(id, format!("router-{id}"), "10.0.0.1", ConnectionKind::Api)
    }

    #[test]
    fn test_add_assigns_id_when_absent() {
        let registry = DeviceRegistry::new();
        let id = registry.add(Device::new("", "r", "10.0.0.1", ConnectionKind::Api));
        assert!(!id.is_empty());
        assert!(registry.contains(&id));
    }

    #[test]
    fn test_add_is_idempotent_per_id() {
        let registry = DeviceRegistry::new();
        registry.add(device("r1"));
        registry.add(device("r1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_unknown_is_not_found() {
        let registry = DeviceRegistry::new();
        let err = registry.remove(&DeviceId::new("nope")).unwrap_err();
        assert!(matches!(err, MonitorError::NotFound(_)));
    }

    #[test]
    fn test_update_preserves_runtime_fields() {
        let registry = DeviceRegistry::new();
        let id = registry.add(device("r1"));
        registry
            .with_device_mut(&id, |d| d.status = DeviceStatus::Online)
            .unwrap();

        let renamed = device("r1").with_monitored(false);
        registry.update(renamed).unwrap();

        let stored = registry.get(&id).unwrap();
        assert!(!stored.monitored);
        assert_eq!(stored.status, DeviceStatus::Online);
    }

    #[test]
    fn test_list_is_a_snapshot() {
        let registry = DeviceRegistry::new();
        registry.add(device("r1"));
        let snapshot = registry.list();
        registry.remove(&DeviceId::new("r1")).unwrap();
        assert_eq!(snapshot.len(), 1);
    }
}
