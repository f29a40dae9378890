use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DhcpLease, LogEntry, NetInterface, ResourceHistory, ResourceThresholds, ResourceUsage};

/// Unique identifier for a monitored device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the device is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Api,
    Snmp,
    Ssh,
}

/// Login credentials for the device connection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(skip_serializing)]
    #[serde(default)]
    pub password: String,
}

/// Observed device status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Unknown,
    Online,
    Offline,
    Warning,
    Error,
}

impl DeviceStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online | Self::Warning)
    }

    /// Next status after a connectivity probe.
    ///
    /// Success promotes Offline/Unknown to Online; failure demotes
    /// Online/Warning/Unknown to Offline. Error is never overridden by a
    /// probe, and a repeated result is a no-op.
    pub fn after_connectivity(self, reachable: bool) -> DeviceStatus {
        match (self, reachable) {
            (Self::Offline | Self::Unknown, true) => Self::Online,
            (Self::Online | Self::Warning | Self::Unknown, false) => Self::Offline,
            (current, _) => current,
        }
    }

    /// Next status after a resource sample.
    ///
    /// A sample over any threshold raises Warning, but never overrides
    /// Offline or Error. A sample under all thresholds clears Warning
    /// back to Online.
    pub fn after_resource_sample(
        self,
        usage: &ResourceUsage,
        thresholds: &ResourceThresholds,
    ) -> DeviceStatus {
        if usage.exceeds(thresholds) {
            match self {
                Self::Offline | Self::Error => self,
                _ => Self::Warning,
            }
        } else if self == Self::Warning {
            Self::Online
        } else {
            self
        }
    }
}

/// Current scalar metrics copied from the latest resource sample
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage_v: Option<f64>,
}

impl DeviceMetrics {
    pub fn from_sample(sample: &ResourceUsage) -> Self {
        Self {
            cpu_percent: sample.cpu_percent,
            memory_percent: sample.memory_percent,
            disk_percent: sample.disk_percent,
            temperature_c: sample.temperature_c,
            voltage_v: sample.voltage_v,
        }
    }
}

/// Monitored device aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub host: String,
    pub connection: ConnectionKind,
    pub credentials: Credentials,
    pub monitored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_id: Option<String>,

    // Runtime fields, mutated only by the task executor during a run
    pub status: DeviceStatus,
    pub last_seen: Option<DateTime<Utc>>,
    pub last_seen_online: Option<DateTime<Utc>>,
    pub metrics: DeviceMetrics,
    pub history: ResourceHistory,
    pub interfaces: Vec<NetInterface>,
    pub leases: Vec<DhcpLease>,
    pub logs: Vec<LogEntry>,
    pub cloud_synced_at: Option<DateTime<Utc>>,
}

impl Device {
    pub fn new(
        id: impl Into<DeviceId>,
        name: impl Into<String>,
        host: impl Into<String>,
        connection: ConnectionKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            host: host.into(),
            connection,
            credentials: Credentials::default(),
            monitored: true,
            cloud_id: None,
            status: DeviceStatus::Unknown,
            last_seen: None,
            last_seen_online: None,
            metrics: DeviceMetrics::default(),
            history: ResourceHistory::default(),
            interfaces: Vec::new(),
            leases: Vec::new(),
            logs: Vec::new(),
            cloud_synced_at: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Credentials {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    pub fn with_cloud_id(mut self, cloud_id: Option<String>) -> Self {
        self.cloud_id = cloud_id;
        self
    }

    pub fn with_monitored(mut self, monitored: bool) -> Self {
        self.monitored = monitored;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = ResourceHistory::new(capacity);
        self
    }

    /// Carry runtime fields over from a previous record. Used when an
    /// update replaces the stored record while a run may be in flight.
    pub fn with_runtime_of(mut self, prev: &Device) -> Self {
        self.status = prev.status;
        self.last_seen = prev.last_seen;
        self.last_seen_online = prev.last_seen_online;
        self.metrics = prev.metrics.clone();
        self.history = prev.history.clone();
        self.interfaces = prev.interfaces.clone();
        self.leases = prev.leases.clone();
        self.logs = prev.logs.clone();
        self.cloud_synced_at = prev.cloud_synced_at;
        self
    }

    /// Record a resource sample: append to history, refresh scalar
    /// metrics, and return the status transition if one occurred.
    pub fn apply_resource_sample(
        &mut self,
        sample: ResourceUsage,
        thresholds: &ResourceThresholds,
    ) -> Option<(DeviceStatus, DeviceStatus)> {
        self.metrics = DeviceMetrics::from_sample(&sample);
        self.last_seen = Some(sample.timestamp);

        let old = self.status;
        let new = old.after_resource_sample(&sample, thresholds);
        self.history.push(sample);

        if new != old {
            self.status = new;
            Some((old, new))
        } else {
            None
        }
    }

    /// Record a connectivity probe result and return the status
    /// transition if one occurred. `last_seen_online` is stamped only
    /// when the device actually transitions to Online.
    pub fn apply_connectivity(&mut self, reachable: bool) -> Option<(DeviceStatus, DeviceStatus)> {
        if reachable {
            self.last_seen = Some(Utc::now());
        }

        let old = self.status;
        let new = old.after_connectivity(reachable);
        if new != old {
            self.status = new;
            if new == DeviceStatus::Online {
                self.last_seen_online = Some(Utc::now());
            }
            Some((old, new))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(cpu: f64) -> ResourceUsage {
        ResourceUsage::new(cpu, 10.0, 10.0)
    }

    #[test]
    fn test_connectivity_transitions() {
        assert_eq!(
            DeviceStatus::Unknown.after_connectivity(true),
            DeviceStatus::Online
        );
        assert_eq!(
            DeviceStatus::Offline.after_connectivity(true),
            DeviceStatus::Online
        );
        assert_eq!(
            DeviceStatus::Online.after_connectivity(false),
            DeviceStatus::Offline
        );
        assert_eq!(
            DeviceStatus::Warning.after_connectivity(false),
            DeviceStatus::Offline
        );
        assert_eq!(
            DeviceStatus::Unknown.after_connectivity(false),
            DeviceStatus::Offline
        );
        // no-ops
        assert_eq!(
            DeviceStatus::Online.after_connectivity(true),
            DeviceStatus::Online
        );
        assert_eq!(
            DeviceStatus::Offline.after_connectivity(false),
            DeviceStatus::Offline
        );
        assert_eq!(
            DeviceStatus::Error.after_connectivity(true),
            DeviceStatus::Error
        );
    }

    #[test]
    fn test_resource_transitions() {
        let t = ResourceThresholds::default();
        assert_eq!(
            DeviceStatus::Online.after_resource_sample(&sample(95.0), &t),
            DeviceStatus::Warning
        );
        assert_eq!(
            DeviceStatus::Warning.after_resource_sample(&sample(50.0), &t),
            DeviceStatus::Online
        );
        // Warning never overrides Offline or Error
        assert_eq!(
            DeviceStatus::Offline.after_resource_sample(&sample(95.0), &t),
            DeviceStatus::Offline
        );
        assert_eq!(
            DeviceStatus::Error.after_resource_sample(&sample(95.0), &t),
            DeviceStatus::Error
        );
        // below thresholds with non-Warning status is a no-op
        assert_eq!(
            DeviceStatus::Online.after_resource_sample(&sample(50.0), &t),
            DeviceStatus::Online
        );
        assert_eq!(
            DeviceStatus::Unknown.after_resource_sample(&sample(50.0), &t),
            DeviceStatus::Unknown
        );
    }

    #[test]
    fn test_sample_sequence_fires_two_transitions() {
        let t = ResourceThresholds::default();
        let mut device = Device::new("r1", "router-1", "10.0.0.1", ConnectionKind::Api);
        device.status = DeviceStatus::Online;

        let transitions: Vec<_> = [50.0, 95.0, 50.0]
            .iter()
            .filter_map(|cpu| device.apply_resource_sample(sample(*cpu), &t))
            .collect();

        assert_eq!(
            transitions,
            vec![
                (DeviceStatus::Online, DeviceStatus::Warning),
                (DeviceStatus::Warning, DeviceStatus::Online),
            ]
        );
        assert_eq!(device.history.len(), 3);
    }

    #[test]
    fn test_last_seen_online_only_on_online_transition() {
        let mut device = Device::new("r1", "router-1", "10.0.0.1", ConnectionKind::Api);

        assert_eq!(
            device.apply_connectivity(false),
            Some((DeviceStatus::Unknown, DeviceStatus::Offline))
        );
        assert!(device.last_seen_online.is_none());

        assert_eq!(
            device.apply_connectivity(true),
            Some((DeviceStatus::Offline, DeviceStatus::Online))
        );
        let stamp = device.last_seen_online;
        assert!(stamp.is_some());

        assert_eq!(
            device.apply_connectivity(false),
            Some((DeviceStatus::Online, DeviceStatus::Offline))
        );
        assert_eq!(device.last_seen_online, stamp);
    }
}
