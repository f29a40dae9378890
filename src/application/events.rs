use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::{DeviceId, DeviceStatus, MonitoringCategory};

/// Default capacity of the event broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Events published by the monitoring core
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    StatusChanged {
        device: DeviceId,
        old: DeviceStatus,
        new: DeviceStatus,
        at: DateTime<Utc>,
    },
    TaskCompleted {
        device: DeviceId,
        category: MonitoringCategory,
        success: bool,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    TaskError {
        device: DeviceId,
        category: MonitoringCategory,
        message: String,
        kind: String,
        at: DateTime<Utc>,
    },
}

/// Fan-out of monitor events over a broadcast channel.
///
/// Subscribers each get their own receiver running in their own task, so a
/// slow, lagging or panicking subscriber cannot stall the scheduler; a send
/// with no receivers is simply dropped.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<MonitorEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }

    pub fn status_changed(&self, device: &DeviceId, old: DeviceStatus, new: DeviceStatus) {
        self.publish(MonitorEvent::StatusChanged {
            device: device.clone(),
            old,
            new,
            at: Utc::now(),
        });
    }

    pub fn task_completed(
        &self,
        device: &DeviceId,
        category: MonitoringCategory,
        success: bool,
        duration_ms: u64,
    ) {
        self.publish(MonitorEvent::TaskCompleted {
            device: device.clone(),
            category,
            success,
            duration_ms,
            at: Utc::now(),
        });
    }

    pub fn task_error(
        &self,
        device: &DeviceId,
        category: MonitoringCategory,
        message: impl Into<String>,
        kind: &str,
    ) {
        self.publish(MonitorEvent::TaskError {
            device: device.clone(),
            category,
            message: message.into(),
            kind: kind.to_string(),
            at: Utc::now(),
        });
    }

    fn publish(&self, event: MonitorEvent) {
        // Err means no live receivers; delivery is fire-and-forget
        let _ = self.tx.send(event);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
