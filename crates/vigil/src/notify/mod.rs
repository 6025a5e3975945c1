/// Notification module - decides which verdict changes are worth telling
/// someone about and delivers them
///
/// - `state`: per-target debounce state
/// - `debouncer`: the `Notifier` that applies transitions to a batch
/// - `slack`: chat webhook delivery
pub mod debouncer;
pub mod slack;
pub mod state;

pub use debouncer::Debouncer;
pub use slack::SlackSender;
pub use state::{NotificationState, NotifyState};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::NotifyError;
use crate::monitoring::{CheckResult, Status};

/// Consumer of one check cycle's results
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, results: &[CheckResult]) -> Result<(), NotifyError>;
}

/// How loud a notification is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Target became unhealthy
    Danger,
    /// Target recovered
    Good,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Danger => "danger",
            Severity::Good => "good",
        }
    }
}

/// An alert or a resolution notice for one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub endpoint: String,
    pub status: Status,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(result: &CheckResult, severity: Severity) -> Self {
        Self {
            title: result.title.clone(),
            endpoint: result.endpoint.clone(),
            status: result.status,
            severity,
            timestamp: result.timestamp,
        }
    }
}

/// Delivery channel for notifications
#[async_trait::async_trait]
pub trait Sender: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Sender that only writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSender;

#[async_trait::async_trait]
impl Sender for LogSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        match notification.severity {
            Severity::Danger => warn!(
                "ALERT {} ({}) is {}",
                notification.title, notification.endpoint, notification.status
            ),
            Severity::Good => info!(
                "RESOLVED {} ({}) is {}",
                notification.title, notification.endpoint, notification.status
            ),
        }
        Ok(())
    }
}
