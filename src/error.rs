use thiserror::Error;

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend returned status {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Feed {feed} unavailable after {attempts} attempts: {reason}")]
    FeedUnavailable {
        feed: String,
        attempts: u32,
        reason: String,
    },

    #[error("Acknowledgment already in flight for alert: {alert_id}")]
    AcknowledgmentPending { alert_id: String },

    #[error("Timeout error: operation timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FleetError {
    /// Whether a retry of the same request could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FleetError::Network(_) | FleetError::Timeout { .. } => true,
            FleetError::Backend { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FleetError>;
