use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::application::MonitorConfig;
use crate::domain::{ConnectionKind, Device, MonitoringCategory, ResourceThresholds};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub resource_interval: u64,
    pub interface_interval: u64,
    pub dhcp_interval: u64,
    pub log_interval: u64,
    pub connectivity_interval: u64,
    pub cloud_interval: u64,
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub disk_threshold: f64,
    pub history_size: usize,
    pub log_limit: usize,
    pub fan_out: usize,
    pub fleet_file: Option<PathBuf>,
    pub log_level: String,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("FLEETMON_PORT", 3000),
            resource_interval: env_parse("FLEETMON_RESOURCE_INTERVAL", 5),
            interface_interval: env_parse("FLEETMON_INTERFACE_INTERVAL", 1),
            dhcp_interval: env_parse("FLEETMON_DHCP_INTERVAL", 30),
            log_interval: env_parse("FLEETMON_LOG_INTERVAL", 30),
            connectivity_interval: env_parse("FLEETMON_CONNECTIVITY_INTERVAL", 15),
            cloud_interval: env_parse("FLEETMON_CLOUD_INTERVAL", 60),
            cpu_threshold: env_parse("FLEETMON_CPU_THRESHOLD", 90.0),
            memory_threshold: env_parse("FLEETMON_MEMORY_THRESHOLD", 90.0),
            disk_threshold: env_parse("FLEETMON_DISK_THRESHOLD", 90.0),
            history_size: env_parse("FLEETMON_HISTORY_SIZE", 300),
            log_limit: env_parse("FLEETMON_LOG_LIMIT", 100),
            fan_out: env_parse("FLEETMON_FAN_OUT", 8),
            fleet_file: env::var("FLEETMON_FLEET_FILE").map(PathBuf::from).ok(),
            log_level: env::var("FLEETMON_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        let mut intervals = [0; 6];
        intervals[MonitoringCategory::Resource.index()] = self.resource_interval;
        intervals[MonitoringCategory::Interface.index()] = self.interface_interval;
        intervals[MonitoringCategory::Dhcp.index()] = self.dhcp_interval;
        intervals[MonitoringCategory::Log.index()] = self.log_interval;
        intervals[MonitoringCategory::Connectivity.index()] = self.connectivity_interval;
        intervals[MonitoringCategory::Cloud.index()] = self.cloud_interval;

        MonitorConfig {
            intervals,
            thresholds: ResourceThresholds {
                cpu_percent: self.cpu_threshold,
                memory_percent: self.memory_threshold,
                disk_percent: self.disk_threshold,
            },
            history_capacity: self.history_size,
            log_limit: self.log_limit,
            fan_out: self.fan_out,
            ..MonitorConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// TOML fleet file: the devices to monitor plus webhook alert targets
#[derive(Debug, Default, Deserialize)]
pub struct FleetFile {
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
    #[serde(default)]
    pub webhooks: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub host: String,
    pub connection: ConnectionKind,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_monitored")]
    pub monitored: bool,
    #[serde(default)]
    pub cloud_id: Option<String>,
}

fn default_monitored() -> bool {
    true
}

impl FleetFile {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

impl DeviceEntry {
    pub fn into_device(self) -> Device {
        Device::new(self.id.unwrap_or_default(), self.name, self.host, self.connection)
            .with_credentials(self.username, self.password)
            .with_monitored(self.monitored)
            .with_cloud_id(self.cloud_id)
    }
}
