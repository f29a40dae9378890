use thiserror::Error;

/// Errors surfaced by the monitoring core
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("precondition not met: {0}")]
    Precondition(String),

    #[error("interval must be positive, got {0}")]
    InvalidInterval(u64),

    #[error("device not found: {0}")]
    NotFound(String),
}

impl MonitorError {
    /// Stable key used by the per-error-kind counters
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Precondition(_) => "precondition",
            Self::InvalidInterval(_) => "invalid_interval",
            Self::NotFound(_) => "not_found",
        }
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
