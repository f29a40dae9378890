use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::{
    ConnectionKind, Device, DeviceId, MonitoringCategory, ResourceThresholds,
    DEFAULT_HISTORY_CAPACITY, DEFAULT_LOG_LIMIT,
};
use crate::error::{MonitorError, MonitorResult};
use crate::ports::{CloudSource, DeviceSource};

use super::events::{MonitorEvent, Notifier, DEFAULT_EVENT_CAPACITY};
use super::executor::{MonitorSettings, TaskExecutor, TaskOutcome};
use super::registry::DeviceRegistry;
use super::stats::{MonitoringStats, StatsCollector};
use super::tasks::{TaskSnapshot, TaskStore};

/// Default bound on concurrently executing task runs
pub const DEFAULT_FAN_OUT: usize = 8;

/// Tunables for a [`Monitor`]
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Seconds between ticks, indexed by [`MonitoringCategory::index`]
    pub intervals: [u64; 6],
    pub thresholds: ResourceThresholds,
    pub history_capacity: usize,
    pub log_limit: usize,
    pub fan_out: usize,
    pub event_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let mut intervals = [0; 6];
        for category in MonitoringCategory::ALL {
            intervals[category.index()] = category.default_interval_secs();
        }
        Self {
            intervals,
            thresholds: ResourceThresholds::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            log_limit: DEFAULT_LOG_LIMIT,
            fan_out: DEFAULT_FAN_OUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Per-category scheduling state. The watch channel carries the current
/// interval so a change re-arms the sleeping loop instead of waiting out
/// the old duration.
struct CategoryState {
    paused: AtomicBool,
    interval_tx: watch::Sender<u64>,
}

impl CategoryState {
    fn new(interval_secs: u64) -> Self {
        let (interval_tx, _) = watch::channel(interval_secs);
        Self {
            paused: AtomicBool::new(false),
            interval_tx,
        }
    }
}

/// Owns the device fleet and drives one periodic loop per monitoring
/// category. All consumer operations (device CRUD, pause/resume,
/// intervals, run-now, stats, event subscription) go through here.
pub struct Monitor {
    registry: Arc<DeviceRegistry>,
    tasks: Arc<TaskStore>,
    stats: Arc<StatsCollector>,
    notifier: Notifier,
    executor: Arc<TaskExecutor>,
    settings: Arc<MonitorSettings>,
    categories: [CategoryState; 6],
    history_capacity: usize,
    fan_out: usize,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Monitor {
    pub fn new(
        config: MonitorConfig,
        sources: HashMap<ConnectionKind, Arc<dyn DeviceSource>>,
        cloud: Option<Arc<dyn CloudSource>>,
    ) -> Arc<Self> {
        let intervals = config.intervals.map(|secs| secs.max(1));

        let registry = Arc::new(DeviceRegistry::new());
        let tasks = Arc::new(TaskStore::new());
        let stats = Arc::new(StatsCollector::new());
        let notifier = Notifier::new(config.event_capacity);
        let settings = Arc::new(MonitorSettings::new(
            config.thresholds,
            config.log_limit,
            intervals,
        ));

        let executor = Arc::new(TaskExecutor::new(
            registry.clone(),
            tasks.clone(),
            stats.clone(),
            notifier.clone(),
            sources,
            cloud,
            settings.clone(),
            config.fan_out,
        ));

        Arc::new(Self {
            registry,
            tasks,
            stats,
            notifier,
            executor,
            settings,
            categories: std::array::from_fn(|i| CategoryState::new(intervals[i])),
            history_capacity: config.history_capacity,
            fan_out: config.fan_out.max(1),
            shutdown: Mutex::new(None),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Spawn the six category loops. A second call while running is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut shutdown = self.shutdown.lock().unwrap();
        if shutdown.is_some() {
            warn!("monitor already started");
            return;
        }
        let (tx, rx) = watch::channel(false);
        *shutdown = Some(tx);
        drop(shutdown);

        self.stats.mark_started();

        let mut handles = self.handles.lock().unwrap();
        for category in MonitoringCategory::ALL {
            handles.push(self.spawn_category_loop(category, rx.clone()));
        }
        info!(devices = self.registry.len(), "monitor started");
    }

    /// Stop issuing ticks, join the loops, and drain in-flight runs so no
    /// task is left with its running flag set.
    pub async fn stop(&self) {
        let Some(tx) = self.shutdown.lock().unwrap().take() else {
            return;
        };
        let _ = tx.send(true);

        let handles: Vec<_> = std::mem::take(&mut *self.handles.lock().unwrap());
        for handle in handles {
            let _ = handle.await;
        }

        // Wait for runs dispatched before the signal to finish
        let permits = self.executor.permits();
        if let Ok(drain) = permits.acquire_many(self.fan_out as u32).await {
            drop(drain);
        }
        self.tasks.reset_running();
        info!("monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.lock().unwrap().is_some()
    }

    fn spawn_category_loop(
        self: &Arc<Self>,
        category: MonitoringCategory,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut interval_rx =
                monitor.categories[category.index()].interval_tx.subscribe();
            debug!(%category, interval = *interval_rx.borrow(), "category loop started");

            loop {
                let secs = *interval_rx.borrow();
                tokio::select! {
                    _ = sleep(Duration::from_secs(secs)) => {
                        if monitor.is_paused(category) {
                            continue;
                        }
                        monitor.dispatch_tick(category);
                    }
                    changed = interval_rx.changed() => {
                        // re-arm the sleep with the new interval
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
            debug!(%category, "category loop stopped");
        })
    }

    /// Fire one tick: dispatch every monitored device as its own task.
    /// Execution is bounded by the executor's permits and the per-task
    /// running flag, so a slow device delays only its own next run.
    fn dispatch_tick(self: &Arc<Self>, category: MonitoringCategory) {
        let devices = self.registry.list();
        for device in devices.into_iter().filter(|d| d.monitored) {
            let monitor = self.clone();
            tokio::spawn(async move {
                monitor.executor.run(&device.id, category).await;
            });
        }
    }

    // ---- device operations ----

    pub fn add_device(&self, mut device: Device) -> DeviceId {
        if device.history.is_empty() && device.history.capacity() != self.history_capacity {
            device = device.with_history_capacity(self.history_capacity);
        }
        let id = self.registry.add(device);
        self.tasks.create_for_device(&id, &self.settings.intervals());
        info!(device = %id, "device added");
        id
    }

    pub async fn remove_device(&self, id: &DeviceId) -> MonitorResult<()> {
        let device = self.registry.remove(id)?;
        self.tasks.remove_device(id);
        self.executor.disconnect(&device).await;
        info!(device = %id, "device removed");
        Ok(())
    }

    pub fn update_device(&self, device: Device) -> MonitorResult<()> {
        self.registry.update(device)
    }

    pub fn get_device(&self, id: &DeviceId) -> Option<Device> {
        self.registry.get(id)
    }

    pub fn list_devices(&self) -> Vec<Device> {
        self.registry.list()
    }

    pub fn device_tasks(&self, id: &DeviceId) -> Vec<TaskSnapshot> {
        self.tasks.snapshot_for_device(id)
    }

    // ---- category operations ----

    pub fn set_interval(&self, category: MonitoringCategory, secs: u64) -> MonitorResult<()> {
        if secs == 0 {
            return Err(MonitorError::InvalidInterval(secs));
        }
        self.settings.set_interval(category, secs);
        self.tasks.set_category_interval(category, secs);
        self.categories[category.index()].interval_tx.send_replace(secs);
        info!(%category, interval = secs, "interval changed");
        Ok(())
    }

    pub fn interval(&self, category: MonitoringCategory) -> u64 {
        self.settings.interval(category)
    }

    pub fn pause(&self, category: MonitoringCategory) {
        self.categories[category.index()]
            .paused
            .store(true, Ordering::Relaxed);
        info!(%category, "category paused");
    }

    pub fn resume(&self, category: MonitoringCategory) {
        self.categories[category.index()]
            .paused
            .store(false, Ordering::Relaxed);
        info!(%category, "category resumed");
    }

    pub fn is_paused(&self, category: MonitoringCategory) -> bool {
        self.categories[category.index()].paused.load(Ordering::Relaxed)
    }

    pub fn set_thresholds(&self, thresholds: ResourceThresholds) {
        self.settings.set_thresholds(thresholds);
    }

    // ---- execution, stats, events ----

    /// Run one category for one device immediately. Returns true only when
    /// the run executed and succeeded; overlap and precondition skips
    /// return false without counting.
    pub async fn run_now(&self, id: &DeviceId, category: MonitoringCategory) -> bool {
        self.executor.run(id, category).await == TaskOutcome::Success
    }

    pub fn stats(&self) -> MonitoringStats {
        self.stats.snapshot(&self.registry.list())
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<MonitorEvent> {
        self.notifier.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::MockSource;
    use crate::domain::DeviceStatus;

    fn quiet_config() -> MonitorConfig {
        // keep every category out of the way unless a test dials it down
        MonitorConfig {
            intervals: [1000; 6],
            ..MonitorConfig::default()
        }
    }

    fn monitor_with(config: MonitorConfig, source: Arc<MockSource>) -> Arc<Monitor> {
        let mut sources: HashMap<ConnectionKind, Arc<dyn DeviceSource>> = HashMap::new();
        sources.insert(ConnectionKind::Api, source);
        Monitor::new(config, sources, None)
    }

    fn api_device(id: &str) -> Device {
        Device::new(id, format!("router-{id}"), "10.0.0.1", ConnectionKind::Api)
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_ticks_collect_resources() {
        let source = Arc::new(MockSource::new());
        let mut config = quiet_config();
        config.intervals[MonitoringCategory::Resource.index()] = 5;
        let monitor = monitor_with(config, source.clone());
        monitor.add_device(api_device("r1"));

        monitor.start();
        tokio::time::sleep(Duration::from_secs(11)).await;
        monitor.stop().await;

        assert_eq!(source.resource_calls(), 2);

        // no timer left armed after stop
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.resource_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_gates_the_very_next_tick() {
        let source = Arc::new(MockSource::new());
        let mut config = quiet_config();
        config.intervals[MonitoringCategory::Resource.index()] = 5;
        let monitor = monitor_with(config, source.clone());
        monitor.add_device(api_device("r1"));

        monitor.pause(MonitoringCategory::Resource);
        monitor.start();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(source.resource_calls(), 0);

        monitor.resume(MonitoringCategory::Resource);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(source.resource_calls() >= 1);

        monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_never_fires_early() {
        let source = Arc::new(MockSource::new());
        let mut config = quiet_config();
        config.intervals[MonitoringCategory::Resource.index()] = 5;
        let monitor = monitor_with(config, source.clone());
        monitor.add_device(api_device("r1"));

        monitor.start();
        tokio::time::sleep(Duration::from_secs(6)).await;
        let before = source.resource_calls();
        assert!(before >= 1);

        monitor.set_interval(MonitoringCategory::Resource, 60).unwrap();
        tokio::time::sleep(Duration::from_secs(55)).await;
        assert_eq!(source.resource_calls(), before);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(source.resource_calls() > before);

        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let source = Arc::new(MockSource::new());
        let monitor = monitor_with(quiet_config(), source);

        let err = monitor.set_interval(MonitoringCategory::Dhcp, 0).unwrap_err();
        assert!(matches!(err, MonitorError::InvalidInterval(0)));
        assert_eq!(monitor.interval(MonitoringCategory::Dhcp), 1000);
    }

    #[tokio::test]
    async fn test_connectivity_probe_sequence() {
        let source = Arc::new(MockSource::new());
        source.push_reachable(false);
        source.push_reachable(true);
        source.push_reachable(false);
        let monitor = monitor_with(quiet_config(), source);
        let id = monitor.add_device(api_device("r1"));
        let mut rx = monitor.subscribe();

        for _ in 0..3 {
            assert!(monitor.run_now(&id, MonitoringCategory::Connectivity).await);
        }

        let mut transitions = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let MonitorEvent::StatusChanged { old, new, .. } = event {
                transitions.push((old, new));
            }
        }
        assert_eq!(
            transitions,
            vec![
                (DeviceStatus::Unknown, DeviceStatus::Offline),
                (DeviceStatus::Offline, DeviceStatus::Online),
                (DeviceStatus::Online, DeviceStatus::Offline),
            ]
        );

        let device = monitor.get_device(&id).unwrap();
        assert_eq!(device.status, DeviceStatus::Offline);
        assert!(device.last_seen_online.is_some());
    }

    #[tokio::test]
    async fn test_resource_sequence_fires_exactly_two_status_events() {
        let source = Arc::new(MockSource::new());
        source.push_cpu(50.0);
        source.push_cpu(95.0);
        source.push_cpu(50.0);
        let monitor = monitor_with(quiet_config(), source);
        let id = monitor.add_device(api_device("r1"));
        // put the device Online first so the sequence starts from a steady state
        let _ = monitor.run_now(&id, MonitoringCategory::Connectivity).await;
        let mut rx = monitor.subscribe();

        for _ in 0..3 {
            assert!(monitor.run_now(&id, MonitoringCategory::Resource).await);
        }

        let mut transitions = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let MonitorEvent::StatusChanged { old, new, .. } = event {
                transitions.push((old, new));
            }
        }
        assert_eq!(
            transitions,
            vec![
                (DeviceStatus::Online, DeviceStatus::Warning),
                (DeviceStatus::Warning, DeviceStatus::Online),
            ]
        );
    }

    #[tokio::test]
    async fn test_stats_reflect_runs_and_are_idempotent() {
        let source = Arc::new(MockSource::new());
        let monitor = monitor_with(quiet_config(), source.clone());
        let id = monitor.add_device(api_device("r1"));

        assert!(monitor.run_now(&id, MonitoringCategory::Resource).await);
        source.fail_resource();
        assert!(!monitor.run_now(&id, MonitoringCategory::Resource).await);

        let a = monitor.stats();
        let b = monitor.stats();
        assert_eq!(a.categories[&MonitoringCategory::Resource].completed, 1);
        assert_eq!(a.categories[&MonitoringCategory::Resource].failed, 1);
        assert_eq!(a.error_kinds["transport"], 1);
        assert_eq!(
            a.categories[&MonitoringCategory::Resource].completed,
            b.categories[&MonitoringCategory::Resource].completed
        );
        assert_eq!(a.error_kinds, b.error_kinds);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_leaves_no_running_flag() {
        let source = Arc::new(MockSource::new());
        let mut config = quiet_config();
        config.intervals[MonitoringCategory::Connectivity.index()] = 5;
        let monitor = monitor_with(config, source.clone());
        let id = monitor.add_device(api_device("r1"));

        source.hold();
        monitor.start();
        source.wait_until_held().await;

        let stopper = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.stop().await })
        };
        source.release();
        stopper.await.unwrap();

        for snapshot in monitor.device_tasks(&id) {
            assert!(!snapshot.running);
        }
    }

    #[tokio::test]
    async fn test_remove_device_drops_its_tasks() {
        let source = Arc::new(MockSource::new());
        let monitor = monitor_with(quiet_config(), source);
        let id = monitor.add_device(api_device("r1"));
        assert_eq!(monitor.device_tasks(&id).len(), 6);

        monitor.remove_device(&id).await.unwrap();
        assert!(monitor.get_device(&id).is_none());
        assert!(monitor.device_tasks(&id).is_empty());

        let err = monitor.remove_device(&id).await.unwrap_err();
        assert!(matches!(err, MonitorError::NotFound(_)));
    }
}
