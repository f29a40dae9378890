use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Device, DeviceStatus, MonitoringCategory};

/// Per-category completed/failed totals
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CategoryStats {
    pub completed: u64,
    pub failed: u64,
}

/// Aggregated view over the whole monitor, recomputed on demand
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringStats {
    pub total_devices: usize,
    pub online_devices: usize,
    pub offline_devices: usize,
    pub warning_devices: usize,
    pub error_devices: usize,
    pub categories: HashMap<MonitoringCategory, CategoryStats>,
    pub error_kinds: HashMap<String, u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
}

/// Owns the run counters the executor reports into.
///
/// Queries produce value snapshots, so reading stats while runs are in
/// flight never observes a torn record.
pub struct StatsCollector {
    completed: [AtomicU64; 6],
    failed: [AtomicU64; 6],
    error_kinds: RwLock<HashMap<String, u64>>,
    started_at: RwLock<Option<DateTime<Utc>>>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            completed: Default::default(),
            failed: Default::default(),
            error_kinds: RwLock::new(HashMap::new()),
            started_at: RwLock::new(None),
        }
    }

    pub fn mark_started(&self) {
        let mut started = self.started_at.write().unwrap();
        if started.is_none() {
            *started = Some(Utc::now());
        }
    }

    pub fn record_success(&self, category: MonitoringCategory) {
        self.completed[category.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, category: MonitoringCategory, kind: &str) {
        self.failed[category.index()].fetch_add(1, Ordering::Relaxed);
        *self
            .error_kinds
            .write()
            .unwrap()
            .entry(kind.to_string())
            .or_insert(0) += 1;
    }

    /// Build the read model from a device snapshot plus the counters
    pub fn snapshot(&self, devices: &[Device]) -> MonitoringStats {
        let mut categories = HashMap::new();
        for category in MonitoringCategory::ALL {
            categories.insert(
                category,
                CategoryStats {
                    completed: self.completed[category.index()].load(Ordering::Relaxed),
                    failed: self.failed[category.index()].load(Ordering::Relaxed),
                },
            );
        }

        let started_at = *self.started_at.read().unwrap();
        let uptime_secs = started_at
            .map(|s| (Utc::now() - s).num_seconds().max(0) as u64)
            .unwrap_or(0);

        let count = |status: DeviceStatus| devices.iter().filter(|d| d.status == status).count();

        MonitoringStats {
            total_devices: devices.len(),
            online_devices: count(DeviceStatus::Online),
            offline_devices: count(DeviceStatus::Offline),
            warning_devices: count(DeviceStatus::Warning),
            error_devices: count(DeviceStatus::Error),
            categories,
            error_kinds: self.error_kinds.read().unwrap().clone(),
            started_at,
            uptime_secs,
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectionKind, Device};

    #[test]
    fn test_counters_land_in_snapshot() {
        let stats = StatsCollector::new();
        stats.record_success(MonitoringCategory::Resource);
        stats.record_success(MonitoringCategory::Resource);
        stats.record_failure(MonitoringCategory::Connectivity, "transport");

        let snap = stats.snapshot(&[]);
        assert_eq!(snap.categories[&MonitoringCategory::Resource].completed, 2);
        assert_eq!(snap.categories[&MonitoringCategory::Connectivity].failed, 1);
        assert_eq!(snap.error_kinds["transport"], 1);
    }

    #[test]
    fn test_snapshot_is_idempotent_without_activity() {
        let stats = StatsCollector::new();
        stats.record_success(MonitoringCategory::Log);

        let mut device = Device::new("r1", "router-1", "10.0.0.1", ConnectionKind::Api);
        device.status = DeviceStatus::Online;
        let devices = vec![device];

        let a = stats.snapshot(&devices);
        let b = stats.snapshot(&devices);
        assert_eq!(a.total_devices, b.total_devices);
        assert_eq!(a.online_devices, b.online_devices);
        assert_eq!(
            a.categories[&MonitoringCategory::Log].completed,
            b.categories[&MonitoringCategory::Log].completed
        );
        assert_eq!(a.error_kinds, b.error_kinds);
    }

    #[test]
    fn test_device_status_counts() {
        let stats = StatsCollector::new();
        let mut devices = Vec::new();
        for (i, status) in [
            DeviceStatus::Online,
            DeviceStatus::Online,
            DeviceStatus::Offline,
            DeviceStatus::Warning,
            DeviceStatus::Unknown,
        ]
        .iter()
        .enumerate()
        {
            let mut d = Device::new(
                format!("r{i}"),
                format!("router-{i}"),
                "10.0.0.1",
                ConnectionKind::Api,
            );
            d.status = *status;
            devices.push(d);
        }

        let snap = stats.snapshot(&devices);
        assert_eq!(snap.total_devices, 5);
        assert_eq!(snap.online_devices, 2);
        assert_eq!(snap.offline_devices, 1);
        assert_eq!(snap.warning_devices, 1);
        assert_eq!(snap.error_devices, 0);
    }
}
