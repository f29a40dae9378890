use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::domain::{Device, DhcpLease, LogEntry, NetInterface, ResourceUsage};
use crate::ports::{DeviceSource, SourceResult};

/// Deterministic in-process device source.
///
/// Answers every collaborator call with synthetic data derived from a
/// per-device tick counter, so demo runs and tests get repeatable load
/// curves without talking to real hardware.
pub struct SimSource {
    ticks: Mutex<HashMap<String, u64>>,
}

impl SimSource {
    pub fn new() -> Self {
        Self {
            ticks: Mutex::new(HashMap::new()),
        }
    }

    fn bump(&self, device: &Device) -> u64 {
        let mut ticks = self.ticks.lock().unwrap();
        let n = ticks.entry(device.id.to_string()).or_insert(0);
        *n += 1;
        *n
    }
}

impl Default for SimSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceSource for SimSource {
    async fn resource_usage(&self, device: &Device) -> SourceResult<ResourceUsage> {
        let n = self.bump(device);
        // sawtooth between ~20% and ~80%
        let cpu = 20.0 + 60.0 * ((n % 10) as f64 / 10.0);
        let memory = 30.0 + 40.0 * (((n + 3) % 10) as f64 / 10.0);
        let disk = 35.0 + (n % 50) as f64 / 2.0;
        Ok(ResourceUsage::new(cpu, memory, disk)
            .with_temperature(38.0 + (n % 6) as f64)
            .with_voltage(23.8 + (n % 4) as f64 / 10.0))
    }

    async fn interfaces(&self, device: &Device) -> SourceResult<Vec<NetInterface>> {
        let n = self.bump(device);
        Ok(vec![
            NetInterface::new("ether1")
                .with_mac("AA:BB:CC:00:00:01")
                .with_running(true)
                .with_traffic(n * 64_000, n * 16_000),
            NetInterface::new("ether2")
                .with_mac("AA:BB:CC:00:00:02")
                .with_running(true)
                .with_traffic(n * 8_000, n * 2_000),
            NetInterface::new("wlan1").with_running(false),
        ])
    }

    async fn dhcp_leases(&self, _device: &Device) -> SourceResult<Vec<DhcpLease>> {
        Ok(vec![
            DhcpLease::new("192.168.88.10", "AA:BB:CC:00:00:10")
                .with_hostname("laptop")
                .with_expiry(Utc::now() + Duration::minutes(30)),
            DhcpLease::new("192.168.88.11", "AA:BB:CC:00:00:11")
                .with_hostname("phone")
                .with_expiry(Utc::now() + Duration::minutes(12)),
        ])
    }

    async fn logs(&self, device: &Device, limit: usize) -> SourceResult<Vec<LogEntry>> {
        let n = self.bump(device);
        let count = limit.min(5);
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            entries.push(LogEntry::new(
                Utc::now() - Duration::seconds((count - i) as i64),
                "system,info",
                format!("simulated event {}", n + i as u64),
            ));
        }
        Ok(entries)
    }

    async fn test_connection(&self, _device: &Device) -> SourceResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConnectionKind;

    #[tokio::test]
    async fn test_sim_produces_bounded_metrics() {
        let sim = SimSource::new();
        let device = Device::new("r1", "router-1", "10.0.0.1", ConnectionKind::Api);

        for _ in 0..20 {
            let usage = sim.resource_usage(&device).await.unwrap();
            assert!((0.0..=100.0).contains(&usage.cpu_percent));
            assert!((0.0..=100.0).contains(&usage.memory_percent));
        }
    }

    #[tokio::test]
    async fn test_sim_honors_log_limit() {
        let sim = SimSource::new();
        let device = Device::new("r1", "router-1", "10.0.0.1", ConnectionKind::Api);
        assert_eq!(sim.logs(&device, 2).await.unwrap().len(), 2);
        assert_eq!(sim.logs(&device, 100).await.unwrap().len(), 5);
    }
}
