use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::domain::{ConnectionKind, Device, DeviceId, MonitoringCategory, ResourceThresholds};
use crate::error::{MonitorError, MonitorResult};
use crate::ports::{CloudSource, DeviceSource};

use super::events::Notifier;
use super::registry::DeviceRegistry;
use super::stats::StatsCollector;
use super::tasks::TaskStore;

/// Result of one task run attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed,
    /// Overlap or precondition skip; counted as neither success nor failure
    Skipped,
}

/// Read-mostly knobs shared between the monitor facade and the executor.
/// Writers swap whole values, readers see either the old or the new one.
pub struct MonitorSettings {
    thresholds: RwLock<ResourceThresholds>,
    log_limit: AtomicUsize,
    intervals: [AtomicU64; 6],
}

impl MonitorSettings {
    pub fn new(thresholds: ResourceThresholds, log_limit: usize, intervals: [u64; 6]) -> Self {
        Self {
            thresholds: RwLock::new(thresholds),
            log_limit: AtomicUsize::new(log_limit),
            intervals: intervals.map(AtomicU64::new),
        }
    }

    pub fn thresholds(&self) -> ResourceThresholds {
        *self.thresholds.read().unwrap()
    }

    pub fn set_thresholds(&self, thresholds: ResourceThresholds) {
        *self.thresholds.write().unwrap() = thresholds;
    }

    pub fn log_limit(&self) -> usize {
        self.log_limit.load(Ordering::Relaxed)
    }

    pub fn interval(&self, category: MonitoringCategory) -> u64 {
        self.intervals[category.index()].load(Ordering::Relaxed)
    }

    pub fn set_interval(&self, category: MonitoringCategory, secs: u64) {
        self.intervals[category.index()].store(secs, Ordering::Relaxed);
    }

    pub fn intervals(&self) -> [u64; 6] {
        let mut out = [0; 6];
        for category in MonitoringCategory::ALL {
            out[category.index()] = self.interval(category);
        }
        out
    }
}

/// Runs the concrete collection action for one (device, category) pair.
///
/// Never lets a collaborator error escape: failures are counted, surfaced
/// through the error event, and the scheduler keeps ticking.
pub struct TaskExecutor {
    registry: Arc<DeviceRegistry>,
    tasks: Arc<TaskStore>,
    stats: Arc<StatsCollector>,
    notifier: Notifier,
    sources: HashMap<ConnectionKind, Arc<dyn DeviceSource>>,
    cloud: Option<Arc<dyn CloudSource>>,
    settings: Arc<MonitorSettings>,
    permits: Arc<Semaphore>,
}

impl TaskExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<DeviceRegistry>,
        tasks: Arc<TaskStore>,
        stats: Arc<StatsCollector>,
        notifier: Notifier,
        sources: HashMap<ConnectionKind, Arc<dyn DeviceSource>>,
        cloud: Option<Arc<dyn CloudSource>>,
        settings: Arc<MonitorSettings>,
        fan_out: usize,
    ) -> Self {
        Self {
            registry,
            tasks,
            stats,
            notifier,
            sources,
            cloud,
            settings,
            permits: Arc::new(Semaphore::new(fan_out.max(1))),
        }
    }

    /// Semaphore bounding concurrent runs; the stop barrier drains it
    pub fn permits(&self) -> Arc<Semaphore> {
        self.permits.clone()
    }

    /// Best-effort session teardown for a removed device
    pub async fn disconnect(&self, device: &Device) {
        if let Some(source) = self.sources.get(&device.connection) {
            source.disconnect(device).await;
        }
    }

    /// Attempt one run of `category` for `id`.
    pub async fn run(&self, id: &DeviceId, category: MonitoringCategory) -> TaskOutcome {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => return TaskOutcome::Skipped,
        };

        let Some(device) = self.registry.get(id) else {
            debug!(device = %id, "run requested for unknown device");
            return TaskOutcome::Skipped;
        };
        if !device.monitored {
            return TaskOutcome::Skipped;
        }

        let task = self
            .tasks
            .get_or_create(id, category, self.settings.interval(category));
        if task.is_paused() {
            return TaskOutcome::Skipped;
        }
        if !task.try_begin() {
            debug!(device = %id, %category, "previous run still in flight, skipping");
            return TaskOutcome::Skipped;
        }

        let started = Utc::now();
        let timer = Instant::now();
        let result = self.collect(&device, category).await;
        let duration_ms = timer.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                task.finish(started, true);
                self.stats.record_success(category);
                self.notifier.task_completed(id, category, true, duration_ms);
                TaskOutcome::Success
            }
            Err(MonitorError::Precondition(reason)) => {
                debug!(device = %id, %category, %reason, "run skipped");
                task.finish_skipped();
                TaskOutcome::Skipped
            }
            Err(err) => {
                warn!(device = %id, %category, error = %err, "run failed");
                task.finish(started, false);
                self.stats.record_failure(category, err.kind());
                self.notifier.task_completed(id, category, false, duration_ms);
                self.notifier
                    .task_error(id, category, err.to_string(), err.kind());
                TaskOutcome::Failed
            }
        }
    }

    async fn collect(&self, device: &Device, category: MonitoringCategory) -> MonitorResult<()> {
        match category {
            MonitoringCategory::Resource => self.collect_resource(device).await,
            MonitoringCategory::Interface => self.collect_interfaces(device).await,
            MonitoringCategory::Dhcp => self.collect_leases(device).await,
            MonitoringCategory::Log => self.collect_logs(device).await,
            MonitoringCategory::Connectivity => self.check_connectivity(device).await,
            MonitoringCategory::Cloud => self.sync_cloud(device).await,
        }
    }

    fn source_for(&self, device: &Device) -> MonitorResult<&Arc<dyn DeviceSource>> {
        self.sources.get(&device.connection).ok_or_else(|| {
            MonitorError::Precondition(format!(
                "no collaborator registered for {} connections",
                match device.connection {
                    ConnectionKind::Api => "api",
                    ConnectionKind::Snmp => "snmp",
                    ConnectionKind::Ssh => "ssh",
                }
            ))
        })
    }

    async fn collect_resource(&self, device: &Device) -> MonitorResult<()> {
        let source = self.source_for(device)?;
        let sample = source
            .resource_usage(device)
            .await
            .map_err(|e| MonitorError::Transport(e.to_string()))?;

        let thresholds = self.settings.thresholds();
        let transition = self
            .registry
            .with_device_mut(&device.id, |d| d.apply_resource_sample(sample, &thresholds))
            .flatten();

        if let Some((old, new)) = transition {
            self.notifier.status_changed(&device.id, old, new);
        }
        Ok(())
    }

    async fn collect_interfaces(&self, device: &Device) -> MonitorResult<()> {
        let source = self.source_for(device)?;
        let interfaces = source
            .interfaces(device)
            .await
            .map_err(|e| MonitorError::Transport(e.to_string()))?;

        self.registry.with_device_mut(&device.id, |d| {
            d.interfaces = interfaces;
            d.last_seen = Some(Utc::now());
        });
        Ok(())
    }

    async fn collect_leases(&self, device: &Device) -> MonitorResult<()> {
        let source = self.source_for(device)?;
        let leases = source
            .dhcp_leases(device)
            .await
            .map_err(|e| MonitorError::Transport(e.to_string()))?;

        self.registry.with_device_mut(&device.id, |d| {
            d.leases = leases;
            d.last_seen = Some(Utc::now());
        });
        Ok(())
    }

    async fn collect_logs(&self, device: &Device) -> MonitorResult<()> {
        let source = self.source_for(device)?;
        let logs = source
            .logs(device, self.settings.log_limit())
            .await
            .map_err(|e| MonitorError::Transport(e.to_string()))?;

        self.registry.with_device_mut(&device.id, |d| {
            d.logs = logs;
            d.last_seen = Some(Utc::now());
        });
        Ok(())
    }

    async fn check_connectivity(&self, device: &Device) -> MonitorResult<()> {
        let source = self.source_for(device)?;
        let (reachable, failure) = match source.test_connection(device).await {
            Ok(reachable) => (reachable, None),
            // An unreachable transport is itself a failed probe
            Err(e) => (false, Some(MonitorError::Transport(e.to_string()))),
        };

        let transition = self
            .registry
            .with_device_mut(&device.id, |d| d.apply_connectivity(reachable))
            .flatten();
        if let Some((old, new)) = transition {
            self.notifier.status_changed(&device.id, old, new);
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn sync_cloud(&self, device: &Device) -> MonitorResult<()> {
        let Some(cloud_id) = device.cloud_id.clone() else {
            return Err(MonitorError::Precondition(
                "device is not cloud-managed".to_string(),
            ));
        };
        let Some(cloud) = &self.cloud else {
            return Err(MonitorError::Precondition(
                "no cloud collaborator registered".to_string(),
            ));
        };
        if !cloud.is_authenticated().await {
            return Err(MonitorError::Precondition(
                "cloud session is not authenticated".to_string(),
            ));
        }

        let record = cloud
            .get_device(&cloud_id)
            .await
            .map_err(|e| MonitorError::Transport(e.to_string()))?
            .ok_or_else(|| {
                MonitorError::Transport(format!("cloud device {cloud_id} not found in account"))
            })?;

        self.registry.with_device_mut(&device.id, |d| {
            d.cloud_synced_at = Some(Utc::now());
            if d.name.is_empty() {
                d.name = record.name.clone();
            }
        });
        Ok(())
    }
}
