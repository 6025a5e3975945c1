/// Monitoring engine module - turns probe attempts into verdicts
///
/// This module is responsible for:
/// - Executing attempts and retries against a probe
/// - Computing latency statistics
/// - Judging attempts against a target's policy
pub mod check;
pub mod executor;
pub mod policy;
pub mod stats;
pub mod types;
pub mod verdict;

pub use check::{BackupCheck, Check, EndpointCheck};
pub use executor::AttemptExecutor;
pub use policy::{MaintenanceWindow, Policy, SeverityMode};
pub use stats::Stats;
pub use types::{Attempt, CheckResult, Status};
pub use verdict::Verdict;
