use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use tracing::{error, warn};

use super::state::NotificationState;
use super::{Notification, Notifier, Sender, Severity};
use crate::error::NotifyError;
use crate::monitoring::CheckResult;

/// Notifier that only speaks when a target crosses the healthy/unhealthy line
pub struct Debouncer<S> {
    sender: S,
    state: Arc<NotificationState>,
    /// Held from transition to delivery so one title's notifications go out
    /// in the order its state changed
    delivery: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S: Sender> Debouncer<S> {
    /// Create a debouncer with fresh state
    pub fn new(sender: S) -> Self {
        Self::with_state(sender, Arc::new(NotificationState::new()))
    }

    /// Create a debouncer over an existing state store
    pub fn with_state(sender: S, state: Arc<NotificationState>) -> Self {
        Self { sender, state, delivery: Mutex::default() }
    }

    pub fn state(&self) -> &Arc<NotificationState> {
        &self.state
    }

    /// Apply the transition of one result and return the notification due
    fn decide(&self, result: &CheckResult) -> Option<Notification> {
        let severity = self.state.transition(&result.title, result.is_healthy())?;
        match severity {
            Severity::Danger => warn!(
                target_title = %result.title,
                status = %result.status,
                reason = result.first_error().unwrap_or_default(),
                "target became unhealthy"
            ),
            Severity::Good => warn!(target_title = %result.title, "target recovered"),
        }
        Some(Notification::new(result, severity))
    }

    fn delivery_lock(&self, title: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(title.to_string()).or_default())
    }

    async fn deliver(&self, result: &CheckResult) {
        let lock = self.delivery_lock(&result.title);
        let _turn = lock.lock().await;

        let Some(notification) = self.decide(result) else {
            return;
        };
        if let Err(e) = self.sender.send(&notification).await {
            error!(
                "Failed to send {} notification for {}: {}",
                notification.severity.as_str(),
                notification.title,
                e
            );
        }
    }
}

#[async_trait::async_trait]
impl<S: Sender> Notifier for Debouncer<S> {
    /// State transitions are recorded before delivery; a failed delivery is
    /// logged and neither retried nor rolled back. Different titles are sent
    /// concurrently, while one title's notifications are delivered in the
    /// order of its transitions, also across overlapping calls.
    async fn notify(&self, results: &[CheckResult]) -> Result<(), NotifyError> {
        join_all(results.iter().map(|result| self.deliver(result))).await;
        Ok(())
    }
}
