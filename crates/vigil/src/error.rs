use thiserror::Error;

/// Setup and configuration failures of a check.
///
/// These are operational faults, distinct from a target being unhealthy:
/// an unhealthy target is reported through the result's attempts, never
/// through this type.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Failed to build client: {0}")]
    Client(String),

    #[error("Failed to list backup catalog '{catalog}': {reason}")]
    Catalog { catalog: String, reason: String },

    #[error("Unknown timezone: {0}")]
    Timezone(String),

    #[error("Invalid time of day '{0}', expected HH:MM:SS")]
    InvalidTime(String),
}

/// Failures while delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification endpoint answered with status {0}")]
    Status(u16),
}
