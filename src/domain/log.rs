use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of log entries fetched per run
pub const DEFAULT_LOG_LIMIT: usize = 100;

/// One log entry retrieved from a monitored device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub topics: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Utc>, topics: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            topics: topics.into(),
            message: message.into(),
        }
    }
}
