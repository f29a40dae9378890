pub mod category;
pub mod device;
pub mod dhcp;
pub mod interface;
pub mod log;
pub mod resource;

pub use category::MonitoringCategory;
pub use device::{ConnectionKind, Credentials, Device, DeviceId, DeviceMetrics, DeviceStatus};
pub use dhcp::DhcpLease;
pub use interface::NetInterface;
pub use log::{LogEntry, DEFAULT_LOG_LIMIT};
pub use resource::{
    ResourceHistory, ResourceThresholds, ResourceUsage, DEFAULT_HISTORY_CAPACITY,
};
