use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::{DeviceId, MonitoringCategory};

/// Scheduling state for one (device, category) pair.
///
/// The running flag is the single synchronization point that keeps a pair
/// from executing twice concurrently: [`MonitoringTask::try_begin`] is an
/// atomic Idle→Running compare-and-swap, so a scheduled tick and a manual
/// run-now can race without double-dispatching.
pub struct MonitoringTask {
    pub device: DeviceId,
    pub category: MonitoringCategory,
    running: AtomicBool,
    paused: AtomicBool,
    interval_secs: AtomicU64,
    success_count: AtomicU64,
    error_count: AtomicU64,
    last_run: RwLock<Option<DateTime<Utc>>>,
    next_run: RwLock<Option<DateTime<Utc>>>,
}

impl MonitoringTask {
    pub fn new(device: DeviceId, category: MonitoringCategory, interval_secs: u64) -> Self {
        Self {
            device,
            category,
            running: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            interval_secs: AtomicU64::new(interval_secs),
            success_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            last_run: RwLock::new(None),
            next_run: RwLock::new(None),
        }
    }

    /// Atomically transition Idle→Running. Returns false when a run is
    /// already in flight; the caller must then skip, not wait.
    pub fn try_begin(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Complete a run: clear the running flag, stamp last/next run times
    /// and bump the success or error counter.
    pub fn finish(&self, started: DateTime<Utc>, success: bool) {
        *self.last_run.write().unwrap() = Some(started);
        *self.next_run.write().unwrap() =
            Some(Utc::now() + Duration::seconds(self.interval_secs.load(Ordering::Relaxed) as i64));
        if success {
            self.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        self.running.store(false, Ordering::Release);
    }

    /// Complete a run that was skipped after the flag was taken (e.g. a
    /// cloud run without an authenticated session). Reschedules without
    /// touching either counter.
    pub fn finish_skipped(&self) {
        *self.next_run.write().unwrap() =
            Some(Utc::now() + Duration::seconds(self.interval_secs.load(Ordering::Relaxed) as i64));
        self.running.store(false, Ordering::Release);
    }

    /// Forcibly clear the running flag. Stop-time backstop only.
    pub fn force_idle(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs.load(Ordering::Relaxed)
    }

    /// Change the interval and push the next scheduled run out to
    /// now + interval, so a shorter interval never causes an early fire.
    pub fn set_interval(&self, secs: u64) {
        self.interval_secs.store(secs, Ordering::Relaxed);
        *self.next_run.write().unwrap() = Some(Utc::now() + Duration::seconds(secs as i64));
    }

    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        *self.last_run.read().unwrap()
    }

    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        *self.next_run.read().unwrap()
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            device: self.device.to_string(),
            category: self.category,
            running: self.is_running(),
            paused: self.is_paused(),
            interval_secs: self.interval_secs(),
            success_count: self.success_count(),
            error_count: self.error_count(),
            last_run: self.last_run(),
            next_run: self.next_run(),
        }
    }
}

/// Serializable point-in-time view of a task
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub device: String,
    pub category: MonitoringCategory,
    pub running: bool,
    pub paused: bool,
    pub interval_secs: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
}

/// Concurrent store of monitoring tasks keyed by (device, category)
pub struct TaskStore {
    tasks: RwLock<HashMap<(DeviceId, MonitoringCategory), Arc<MonitoringTask>>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Idempotent get-or-create for one pair
    pub fn get_or_create(
        &self,
        device: &DeviceId,
        category: MonitoringCategory,
        interval_secs: u64,
    ) -> Arc<MonitoringTask> {
        if let Some(task) = self.get(device, category) {
            return task;
        }
        let mut tasks = self.tasks.write().unwrap();
        tasks
            .entry((device.clone(), category))
            .or_insert_with(|| {
                Arc::new(MonitoringTask::new(device.clone(), category, interval_secs))
            })
            .clone()
    }

    pub fn get(&self, device: &DeviceId, category: MonitoringCategory) -> Option<Arc<MonitoringTask>> {
        self.tasks
            .read()
            .unwrap()
            .get(&(device.clone(), category))
            .cloned()
    }

    /// Create one task per category for a newly added device
    pub fn create_for_device(&self, device: &DeviceId, intervals: &[u64; 6]) {
        for category in MonitoringCategory::ALL {
            self.get_or_create(device, category, intervals[category.index()]);
        }
    }

    /// Drop every task belonging to a removed device
    pub fn remove_device(&self, device: &DeviceId) {
        self.tasks
            .write()
            .unwrap()
            .retain(|(id, _), _| id != device);
    }

    /// Propagate an interval change to every task of a category
    pub fn set_category_interval(&self, category: MonitoringCategory, secs: u64) {
        for task in self.tasks.read().unwrap().values() {
            if task.category == category {
                task.set_interval(secs);
            }
        }
    }

    /// Clear any running flag left over after the loops were joined
    pub fn reset_running(&self) {
        for task in self.tasks.read().unwrap().values() {
            task.force_idle();
        }
    }

    pub fn snapshot_for_device(&self, device: &DeviceId) -> Vec<TaskSnapshot> {
        let mut snapshots: Vec<_> = self
            .tasks
            .read()
            .unwrap()
            .values()
            .filter(|t| &t.device == device)
            .map(|t| t.snapshot())
            .collect();
        snapshots.sort_by_key(|s| s.category.index());
        snapshots
    }

    pub fn len(&self) -> usize {
        self.tasks.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}
