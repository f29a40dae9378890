use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::device_source::SourceResult;

/// Device record as known to the cloud account
#[derive(Debug, Clone)]
pub struct CloudDevice {
    pub id: String,
    pub name: String,
    pub public_address: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Port for the cloud management service
#[async_trait]
pub trait CloudSource: Send + Sync {
    /// Whether an authenticated cloud session exists
    async fn is_authenticated(&self) -> bool;

    /// Look up a device by its cloud identifier
    async fn get_device(&self, cloud_id: &str) -> SourceResult<Option<CloudDevice>>;
}
