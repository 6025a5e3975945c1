//! Reduction of attempts into a tri-state verdict.

use chrono::{DateTime, Utc};

use super::policy::{Policy, SeverityMode};
use super::stats::Stats;
use super::types::{Attempt, Status};
use crate::probe::backup::{BackupItem, BackupPolicy};

pub const NO_BACKUP: &str = "no backup found";
pub const NO_RECENT_BACKUP: &str = "no recent backup";
pub const BACKUP_TOO_SMALL: &str = "backup size below minimum";

/// Status of a check together with the explanation for a degraded latency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: Status,
    pub notice: Option<String>,
}

impl Verdict {
    fn of(status: Status) -> Self {
        Self { status, notice: None }
    }
}

/// Judge the attempts of an endpoint check.
///
/// Precedence: a maintenance window covering `now` wins over everything,
/// then any failed attempt, then the median latency threshold.
pub fn evaluate(attempts: &[Attempt], policy: &Policy, now: DateTime<Utc>) -> Verdict {
    if policy.in_maintenance(now) {
        return Verdict::of(Status::Healthy);
    }

    if attempts.iter().any(|a| !a.is_success()) {
        return match policy.severity {
            SeverityMode::Down => Verdict::of(Status::Down),
            SeverityMode::Degraded => Verdict::of(Status::Degraded),
        };
    }

    if !policy.latency_threshold.is_zero() {
        if let Some(stats) = Stats::compute(attempts) {
            if stats.median > policy.latency_threshold {
                return Verdict {
                    status: Status::Degraded,
                    notice: Some(format!(
                        "median round trip time exceeded threshold ({:?})",
                        policy.latency_threshold
                    )),
                };
            }
        }
    }

    Verdict::of(Status::Healthy)
}

/// Judge a backup catalog listing as a single implicit attempt.
///
/// Only available items count. The newest one must be younger than
/// `min_age` and, when a floor is set, at least `min_size` bytes; the size
/// reason replaces the age reason when both apply.
pub fn evaluate_backup(items: &[BackupItem], policy: &BackupPolicy, now: DateTime<Utc>) -> (Attempt, Verdict) {
    let latest = items.iter().filter(|item| item.available).max_by_key(|item| item.created_at);

    let mut reason = None;
    match latest {
        None => reason = Some(NO_BACKUP),
        Some(item) => {
            let oldest_allowed = chrono::Duration::from_std(policy.min_age)
                .ok()
                .and_then(|age| now.checked_sub_signed(age));
            if oldest_allowed.is_some_and(|cutoff| item.created_at < cutoff) {
                reason = Some(NO_RECENT_BACKUP);
            }
            if let (Some(floor), Some(size)) = (policy.min_size, item.size) {
                if size < floor {
                    reason = Some(BACKUP_TOO_SMALL);
                }
            }
        }
    }

    match reason {
        Some(reason) => (Attempt::failure(reason), Verdict::of(Status::Down)),
        None => (Attempt::default(), Verdict::of(Status::Healthy)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::monitoring::policy::MaintenanceWindow;

    fn ok(ms: u64) -> Attempt {
        Attempt::success(Duration::from_millis(ms))
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-06-15T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn noon_window() -> MaintenanceWindow {
        MaintenanceWindow::parse("11:30:00", Duration::from_secs(3600), Some("UTC")).unwrap()
    }

    #[test]
    fn test_all_success_is_healthy() {
        let verdict = evaluate(&[ok(10), ok(12)], &Policy::default(), now());
        assert_eq!(verdict.status, Status::Healthy);
        assert!(verdict.notice.is_none());
    }

    #[test]
    fn test_failure_is_down_by_default() {
        let verdict = evaluate(&[ok(10), Attempt::failure("refused")], &Policy::default(), now());
        assert_eq!(verdict.status, Status::Down);
    }

    #[test]
    fn test_failure_is_degraded_in_degraded_mode() {
        let policy = Policy { severity: SeverityMode::Degraded, ..Default::default() };
        let verdict = evaluate(&[Attempt::failure("refused")], &policy, now());
        assert_eq!(verdict.status, Status::Degraded);
        assert!(verdict.notice.is_none());
    }

    #[test]
    fn test_maintenance_window_hides_failures() {
        let policy = Policy { maintenance_windows: vec![noon_window()], ..Default::default() };
        let verdict = evaluate(&[Attempt::failure("refused")], &policy, now());
        assert_eq!(verdict.status, Status::Healthy);
    }

    #[test]
    fn test_maintenance_window_outside_does_not_apply() {
        let policy = Policy { maintenance_windows: vec![noon_window()], ..Default::default() };
        let later = now() + chrono::Duration::hours(2);
        let verdict = evaluate(&[Attempt::failure("refused")], &policy, later);
        assert_eq!(verdict.status, Status::Down);
    }

    #[test]
    fn test_median_above_threshold_degrades() {
        let policy = Policy { latency_threshold: Duration::from_millis(15), ..Default::default() };

        let verdict = evaluate(&[ok(10), ok(20), ok(30)], &policy, now());
        assert_eq!(verdict.status, Status::Degraded);
        assert!(verdict.notice.unwrap().contains("15ms"));

        let verdict = evaluate(&[ok(5), ok(10), ok(30)], &policy, now());
        assert_eq!(verdict.status, Status::Healthy);
    }

    #[test]
    fn test_failure_takes_precedence_over_latency() {
        let policy = Policy { latency_threshold: Duration::from_millis(1), ..Default::default() };
        let verdict = evaluate(&[ok(50), Attempt::failure("timeout")], &policy, now());
        assert_eq!(verdict.status, Status::Down);
        assert!(verdict.notice.is_none());
    }

    #[test]
    fn test_backup_without_items_is_down() {
        let (attempt, verdict) = evaluate_backup(&[], &BackupPolicy::default(), now());
        assert_eq!(attempt.error.as_deref(), Some(NO_BACKUP));
        assert_eq!(verdict.status, Status::Down);
    }

    #[test]
    fn test_backup_ignores_unavailable_items() {
        let items = vec![BackupItem {
            created_at: now() - chrono::Duration::hours(1),
            size: None,
            available: false,
        }];
        let (attempt, _) = evaluate_backup(&items, &BackupPolicy::default(), now());
        assert_eq!(attempt.error.as_deref(), Some(NO_BACKUP));
    }

    #[test]
    fn test_backup_age_threshold() {
        let old = vec![BackupItem::available(now() - chrono::Duration::hours(40), None)];
        let (attempt, verdict) = evaluate_backup(&old, &BackupPolicy::default(), now());
        assert_eq!(attempt.error.as_deref(), Some(NO_RECENT_BACKUP));
        assert_eq!(verdict.status, Status::Down);

        let fresh = vec![BackupItem::available(now() - chrono::Duration::hours(10), None)];
        let (attempt, verdict) = evaluate_backup(&fresh, &BackupPolicy::default(), now());
        assert!(attempt.is_success());
        assert_eq!(verdict.status, Status::Healthy);
    }

    #[test]
    fn test_backup_newest_item_decides() {
        let items = vec![
            BackupItem::available(now() - chrono::Duration::hours(50), None),
            BackupItem::available(now() - chrono::Duration::hours(2), None),
            BackupItem::available(now() - chrono::Duration::hours(70), None),
        ];
        let (_, verdict) = evaluate_backup(&items, &BackupPolicy::default(), now());
        assert_eq!(verdict.status, Status::Healthy);
    }

    #[test]
    fn test_backup_size_floor() {
        let policy = BackupPolicy::bucket();
        let small = vec![BackupItem::available(now() - chrono::Duration::hours(1), Some(512))];
        let (attempt, verdict) = evaluate_backup(&small, &policy, now());
        assert_eq!(attempt.error.as_deref(), Some(BACKUP_TOO_SMALL));
        assert_eq!(verdict.status, Status::Down);

        // size wins over age when both fail
        let both = vec![BackupItem::available(now() - chrono::Duration::hours(48), Some(512))];
        let (attempt, _) = evaluate_backup(&both, &policy, now());
        assert_eq!(attempt.error.as_deref(), Some(BACKUP_TOO_SMALL));
    }
}
