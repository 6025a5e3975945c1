//! Vigil - health verdicts and debounced notifications
//!
//! Targets (HTTP endpoints, backup catalogs) are probed through the
//! [`probe`] capabilities, reduced to a healthy / degraded / down verdict by
//! [`monitoring`], and reported by [`notify`] only when their health flips.

pub mod error;
pub mod monitoring;
pub mod notify;
pub mod probe;

// Re-export main types
pub use error::{CheckError, NotifyError};
pub use monitoring::{
    Attempt, AttemptExecutor, BackupCheck, Check, CheckResult, EndpointCheck, MaintenanceWindow, Policy,
    SeverityMode, Stats, Status,
};
pub use notify::{Debouncer, LogSender, NotificationState, Notifier, SlackSender};
pub use probe::{BackupCatalog, BackupItem, BackupPolicy, DirectoryCatalog, HttpProbe, Probe, TransportConfig};
