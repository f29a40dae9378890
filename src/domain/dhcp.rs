use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One DHCP lease handed out by a monitored device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DhcpLease {
    pub address: String,
    pub mac_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub dynamic: bool,
}

impl DhcpLease {
    pub fn new(address: impl Into<String>, mac_address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            mac_address: mac_address.into(),
            hostname: None,
            server: None,
            expires_at: None,
            dynamic: true,
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}
