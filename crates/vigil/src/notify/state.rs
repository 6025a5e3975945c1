//! Debounce state per target title.
//!
//! Each title owns its own slot; a transition locks only that slot, so
//! results for different titles never wait on each other and results for the
//! same title are applied one at a time. State lives as long as its owner and
//! is never persisted: after a restart every title starts `Unset` again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::Severity;

/// Last known health of a title, as far as notifications are concerned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotifyState {
    #[default]
    Unset,
    Healthy,
    Unhealthy,
}

impl NotifyState {
    /// Apply a verdict and return the new state with the notification to emit.
    pub fn next(self, healthy: bool) -> (NotifyState, Option<Severity>) {
        match (self, healthy) {
            (NotifyState::Unset | NotifyState::Healthy, true) => (NotifyState::Healthy, None),
            (NotifyState::Unset | NotifyState::Healthy, false) => {
                (NotifyState::Unhealthy, Some(Severity::Danger))
            }
            (NotifyState::Unhealthy, false) => (NotifyState::Unhealthy, None),
            (NotifyState::Unhealthy, true) => (NotifyState::Healthy, Some(Severity::Good)),
        }
    }
}

/// Injectable store of per-title debounce state
#[derive(Debug, Default)]
pub struct NotificationState {
    slots: RwLock<HashMap<String, Arc<Mutex<NotifyState>>>>,
}

impl NotificationState {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, title: &str) -> Arc<Mutex<NotifyState>> {
        if let Some(slot) = self.slots.read().unwrap_or_else(PoisonError::into_inner).get(title) {
            return Arc::clone(slot);
        }

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(title.to_string()).or_default())
    }

    /// Atomically read, decide and write the state of `title`.
    pub fn transition(&self, title: &str, healthy: bool) -> Option<Severity> {
        let slot = self.slot(title);
        let mut state = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let (next, severity) = state.next(healthy);
        *state = next;
        severity
    }

    pub fn get(&self, title: &str) -> NotifyState {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(title)
            .map(|slot| *slot.lock().unwrap_or_else(PoisonError::into_inner))
            .unwrap_or_default()
    }
}
