//! Mock collaborators shared by the application-layer tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use crate::domain::{Device, DhcpLease, LogEntry, NetInterface, ResourceUsage};
use crate::ports::{CloudDevice, CloudSource, DeviceSource, SourceResult};

/// Scripted device collaborator.
///
/// Responds with queued values (falling back to benign defaults), can be
/// told to fail, and can hold calls open so tests can observe overlap.
pub struct MockSource {
    cpu: Mutex<VecDeque<f64>>,
    reachable: Mutex<VecDeque<bool>>,
    fail_resource: AtomicBool,
    fail_connection: AtomicBool,
    held: AtomicBool,
    entered: Notify,
    release: Notify,
    resource_calls: AtomicUsize,
    connection_calls: AtomicUsize,
    interface_calls: AtomicUsize,
    lease_calls: AtomicUsize,
    log_calls: AtomicUsize,
    last_log_limit: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            cpu: Mutex::new(VecDeque::new()),
            reachable: Mutex::new(VecDeque::new()),
            fail_resource: AtomicBool::new(false),
            fail_connection: AtomicBool::new(false),
            held: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
            resource_calls: AtomicUsize::new(0),
            connection_calls: AtomicUsize::new(0),
            interface_calls: AtomicUsize::new(0),
            lease_calls: AtomicUsize::new(0),
            log_calls: AtomicUsize::new(0),
            last_log_limit: AtomicUsize::new(0),
        }
    }

    pub fn push_cpu(&self, cpu: f64) {
        self.cpu.lock().unwrap().push_back(cpu);
    }

    pub fn push_reachable(&self, reachable: bool) {
        self.reachable.lock().unwrap().push_back(reachable);
    }

    pub fn fail_resource(&self) {
        self.fail_resource.store(true, Ordering::Relaxed);
    }

    pub fn fail_connection(&self) {
        self.fail_connection.store(true, Ordering::Relaxed);
    }

    /// Make the next resource/connectivity call block until [`release`]
    pub fn hold(&self) {
        self.held.store(true, Ordering::Relaxed);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::Relaxed);
        self.release.notify_one();
    }

    /// Wait until a held call has reached the collaborator
    pub async fn wait_until_held(&self) {
        self.entered.notified().await;
    }

    pub fn resource_calls(&self) -> usize {
        self.resource_calls.load(Ordering::Relaxed)
    }

    pub fn connection_calls(&self) -> usize {
        self.connection_calls.load(Ordering::Relaxed)
    }

    pub fn interface_calls(&self) -> usize {
        self.interface_calls.load(Ordering::Relaxed)
    }

    pub fn last_log_limit(&self) -> usize {
        self.last_log_limit.load(Ordering::Relaxed)
    }

    async fn maybe_hold(&self) {
        if self.held.load(Ordering::Relaxed) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl DeviceSource for MockSource {
    async fn resource_usage(&self, _device: &Device) -> SourceResult<ResourceUsage> {
        self.maybe_hold().await;
        self.resource_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_resource.load(Ordering::Relaxed) {
            return Err("resource fetch refused".into());
        }
        let cpu = self.cpu.lock().unwrap().pop_front().unwrap_or(10.0);
        Ok(ResourceUsage::new(cpu, 20.0, 30.0).with_temperature(41.0))
    }

    async fn interfaces(&self, _device: &Device) -> SourceResult<Vec<NetInterface>> {
        self.interface_calls.fetch_add(1, Ordering::Relaxed);
        Ok(vec![
            NetInterface::new("ether1")
                .with_mac("AA:BB:CC:00:00:01")
                .with_running(true)
                .with_traffic(1_024, 2_048),
            NetInterface::new("wlan1").with_running(false),
        ])
    }

    async fn dhcp_leases(&self, _device: &Device) -> SourceResult<Vec<DhcpLease>> {
        self.lease_calls.fetch_add(1, Ordering::Relaxed);
        Ok(vec![DhcpLease::new("192.168.88.10", "AA:BB:CC:00:00:10")
            .with_hostname("laptop")])
    }

    async fn logs(&self, _device: &Device, limit: usize) -> SourceResult<Vec<LogEntry>> {
        self.log_calls.fetch_add(1, Ordering::Relaxed);
        self.last_log_limit.store(limit, Ordering::Relaxed);
        Ok(vec![LogEntry::new(Utc::now(), "system,info", "config saved")])
    }

    async fn test_connection(&self, _device: &Device) -> SourceResult<bool> {
        self.maybe_hold().await;
        self.connection_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_connection.load(Ordering::Relaxed) {
            return Err("connection refused".into());
        }
        Ok(self.reachable.lock().unwrap().pop_front().unwrap_or(true))
    }
}

/// Scripted cloud collaborator
pub struct MockCloud {
    authenticated: AtomicBool,
    devices: Mutex<HashMap<String, CloudDevice>>,
}

impl MockCloud {
    pub fn new(authenticated: bool) -> Self {
        Self {
            authenticated: AtomicBool::new(authenticated),
            devices: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, cloud_id: &str, name: &str) {
        self.devices.lock().unwrap().insert(
            cloud_id.to_string(),
            CloudDevice {
                id: cloud_id.to_string(),
                name: name.to_string(),
                public_address: None,
                last_seen: Some(Utc::now()),
            },
        );
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::Relaxed);
    }
}

#[async_trait]
impl CloudSource for MockCloud {
    async fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Relaxed)
    }

    async fn get_device(&self, cloud_id: &str) -> SourceResult<Option<CloudDevice>> {
        Ok(self.devices.lock().unwrap().get(cloud_id).cloned())
    }
}
