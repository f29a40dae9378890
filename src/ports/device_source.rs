use async_trait::async_trait;

use crate::domain::{Device, DhcpLease, LogEntry, NetInterface, ResourceUsage};

pub type SourceResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Port for talking to a device over one connection kind (API, SNMP, SSH).
///
/// Implementations are thin request/response wrappers; every call may fail
/// and the task executor is responsible for catching those failures.
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// Fetch a resource-usage snapshot (cpu/memory/disk/temperature/voltage)
    async fn resource_usage(&self, device: &Device) -> SourceResult<ResourceUsage>;

    /// List the device's network interfaces with counters
    async fn interfaces(&self, device: &Device) -> SourceResult<Vec<NetInterface>>;

    /// List the DHCP leases the device currently holds
    async fn dhcp_leases(&self, device: &Device) -> SourceResult<Vec<DhcpLease>>;

    /// Fetch up to `limit` of the most recent log entries
    async fn logs(&self, device: &Device, limit: usize) -> SourceResult<Vec<LogEntry>>;

    /// Lightweight reachability probe
    async fn test_connection(&self, device: &Device) -> SourceResult<bool>;

    /// Best-effort teardown of any open session. Must not fail.
    async fn disconnect(&self, _device: &Device) {}
}
