//! Per-target check policy.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::CheckError;

/// Zone used for maintenance windows when neither the window nor `TZ` names one
pub const FALLBACK_TIMEZONE: Tz = chrono_tz::Europe::Paris;

/// Verdict to report when an attempt fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityMode {
    #[default]
    Down,
    Degraded,
}

/// Operator declared daily interval during which failures are ignored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceWindow {
    /// Local time of day the window opens, re-anchored to the current date
    pub start: NaiveTime,
    pub duration: Duration,
    pub timezone: Tz,
}

impl MaintenanceWindow {
    /// Build a window from its textual form.
    ///
    /// `timezone` falls back to the `TZ` environment variable, then to
    /// [`FALLBACK_TIMEZONE`].
    pub fn parse(start: &str, duration: Duration, timezone: Option<&str>) -> Result<Self, CheckError> {
        let env_tz = std::env::var("TZ").ok();
        let timezone = resolve_timezone(timezone, env_tz.as_deref())?;
        let start = NaiveTime::parse_from_str(start.trim(), "%H:%M:%S")
            .map_err(|_| CheckError::InvalidTime(start.to_string()))?;

        Ok(Self { start, duration, timezone })
    }

    /// Whether `now` falls in `[start, start + duration)` of today's
    /// occurrence, today being the calendar date of `now` in the window's zone.
    pub fn covers(&self, now: DateTime<Utc>) -> bool {
        let local_now = now.with_timezone(&self.timezone);
        let anchored = local_now.date_naive().and_time(self.start);

        // Start times skipped by a DST jump do not open a window that day.
        let Some(opens) = self.timezone.from_local_datetime(&anchored).earliest() else {
            return false;
        };
        let Ok(length) = chrono::Duration::from_std(self.duration) else {
            return false;
        };

        opens <= local_now && local_now < opens + length
    }
}

/// Pick the window timezone: explicit value, then the environment override,
/// then the fallback zone. An explicit but unknown zone is an error; an unknown
/// environment value is ignored.
pub fn resolve_timezone(explicit: Option<&str>, env_tz: Option<&str>) -> Result<Tz, CheckError> {
    if let Some(name) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
        return Tz::from_str(name).map_err(|_| CheckError::Timezone(name.to_string()));
    }

    match env_tz.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => match Tz::from_str(name) {
            Ok(tz) => Ok(tz),
            Err(_) => {
                tracing::warn!("Ignoring unknown TZ value '{}', using {}", name, FALLBACK_TIMEZONE);
                Ok(FALLBACK_TIMEZONE)
            }
        },
        None => Ok(FALLBACK_TIMEZONE),
    }
}

/// How one target is probed and judged
#[derive(Debug, Clone)]
pub struct Policy {
    /// Top-level attempts per check, at least one
    pub attempts: u32,

    /// Extra tries after a failed attempt
    pub retries: u32,

    /// Wait between top-level attempts
    pub attempt_spacing: Duration,

    /// Wait before each retry
    pub retry_spacing: Duration,

    /// Median latency above which a check is degraded; zero disables it
    pub latency_threshold: Duration,

    pub maintenance_windows: Vec<MaintenanceWindow>,

    pub severity: SeverityMode,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            attempts: 1,
            retries: 0,
            attempt_spacing: Duration::ZERO,
            retry_spacing: Duration::ZERO,
            latency_threshold: Duration::ZERO,
            maintenance_windows: Vec::new(),
            severity: SeverityMode::Down,
        }
    }
}

impl Policy {
    /// Whether any maintenance window covers `now`
    pub fn in_maintenance(&self, now: DateTime<Utc>) -> bool {
        self.maintenance_windows.iter().any(|w| w.covers(now))
    }
}

/// Parse a duration string like "500ms", "30s", "5m", "36h", "1h30m" or a
/// plain number of seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let value: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value * 60),
            "h" => Duration::from_secs(value * 3600),
            "d" => Duration::from_secs(value * 86_400),
            _ => return None,
        };
        total += part;
        rest = &rest[unit_len..];
    }

    Some(total)
}
