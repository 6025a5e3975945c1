//! Turns configuration entries into runnable checks.

use std::time::Duration;

use tracing::warn;
use vigil::probe::backup::{DEFAULT_MIN_AGE, DEFAULT_MIN_SIZE};
use vigil::{
    BackupCheck, BackupPolicy, Check, DirectoryCatalog, EndpointCheck, HttpProbe, MaintenanceWindow, Policy,
    TransportConfig,
};

use crate::config::{BackupSource, BackupTarget, Config, Error, HttpTarget, duration_field};

fn invalid(target: &str, err: impl ToString) -> Error {
    Error::InvalidTarget { target: target.to_string(), reason: err.to_string() }
}

fn optional_duration(field: &str, value: Option<&String>) -> Result<Duration, Error> {
    value.map(|v| duration_field(field, v)).transpose().map(Option::unwrap_or_default)
}

/// Build the check policy of an HTTP target, clamping counts to their floors
pub fn http_policy(target: &HttpTarget) -> Result<Policy, Error> {
    let field = |name: &str| format!("{}.{}", target.name, name);

    let maintenance_windows = target
        .maintenance_windows
        .iter()
        .map(|w| {
            let duration = duration_field(&field("maintenance_windows.duration"), &w.duration)?;
            MaintenanceWindow::parse(&w.start, duration, w.timezone.as_deref()).map_err(|e| invalid(&target.name, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Policy {
        attempts: u32::try_from(target.attempts.unwrap_or(1).max(1)).unwrap_or(u32::MAX),
        retries: u32::try_from(target.retries.unwrap_or(0).max(0)).unwrap_or(u32::MAX),
        attempt_spacing: optional_duration(&field("attempt_spacing"), target.attempt_spacing.as_ref())?,
        retry_spacing: optional_duration(&field("retry_spacing"), target.retry_spacing.as_ref())?,
        latency_threshold: optional_duration(&field("latency_threshold"), target.latency_threshold.as_ref())?,
        maintenance_windows,
        severity: target.severity.unwrap_or_default(),
    })
}

fn http_check(target: &HttpTarget) -> Result<Box<dyn Check>, Error> {
    let mut transport = TransportConfig {
        insecure_skip_verify: target.insecure_skip_verify,
        follow_redirects: target.follow_redirects,
        keep_alive: target.keep_alive,
        ..TransportConfig::default()
    };
    if let Some(timeout) = &target.timeout {
        transport.timeout = duration_field(&format!("{}.timeout", target.name), timeout)?;
    }

    let mut probe = HttpProbe::new(&target.url, &transport).map_err(|e| invalid(&target.name, e))?;
    if let Some(status) = target.up_status {
        probe = probe.with_up_status(status).map_err(|e| invalid(&target.name, e))?;
    }
    if let Some(needle) = &target.must_contain {
        probe = probe.with_must_contain(needle.clone());
    }
    if let Some(needle) = &target.must_not_contain {
        probe = probe.with_must_not_contain(needle.clone());
    }
    for (name, value) in &target.headers {
        probe = probe.with_header(name.clone(), value.clone());
    }
    if let Some(auth) = &target.basic_auth {
        probe = probe.with_basic_auth(auth.username.clone(), auth.password.clone());
    }

    Ok(Box::new(EndpointCheck::new(target.name.clone(), probe, http_policy(target)?)))
}

/// Thresholds of a backup target; buckets and directories get a size floor
pub fn backup_policy(target: &BackupTarget) -> Result<BackupPolicy, Error> {
    let min_age = match &target.min_age_threshold {
        Some(value) => duration_field(&format!("{}.min_age_threshold", target.name), value)?,
        None => DEFAULT_MIN_AGE,
    };

    let min_size = match target.source {
        BackupSource::Directory { .. } | BackupSource::S3 { .. } => {
            Some(target.min_size_threshold.unwrap_or(DEFAULT_MIN_SIZE))
        }
        BackupSource::Rds { .. } | BackupSource::Ami { .. } => {
            if target.min_size_threshold.is_some() {
                warn!("Ignoring min_size_threshold of '{}': its catalog has no sizes", target.name);
            }
            None
        }
    };

    Ok(BackupPolicy { min_age, min_size })
}

async fn backup_check(target: &BackupTarget) -> Result<Box<dyn Check>, Error> {
    let policy = backup_policy(target)?;
    let name = target.name.clone();

    let check: Box<dyn Check> = match &target.source {
        BackupSource::Directory { path, prefix } => {
            Box::new(BackupCheck::new(name, DirectoryCatalog::new(path.clone(), prefix.clone()), policy))
        }
        #[cfg(feature = "aws")]
        BackupSource::S3 { region, bucket, prefix } => {
            let catalog = vigil::probe::aws::S3BucketCatalog::connect(region.as_deref(), bucket, prefix).await;
            Box::new(BackupCheck::new(name, catalog, policy))
        }
        #[cfg(feature = "aws")]
        BackupSource::Rds { region, instance } => {
            let catalog = vigil::probe::aws::RdsSnapshotCatalog::connect(region.as_deref(), instance).await;
            Box::new(BackupCheck::new(name, catalog, policy))
        }
        #[cfg(feature = "aws")]
        BackupSource::Ami { region, prefix, owners } => {
            let catalog = vigil::probe::aws::AmiCatalog::connect(region.as_deref(), prefix, owners.clone()).await;
            Box::new(BackupCheck::new(name, catalog, policy))
        }
        #[cfg(not(feature = "aws"))]
        BackupSource::S3 { .. } | BackupSource::Rds { .. } | BackupSource::Ami { .. } => {
            return Err(invalid(&target.name, "built without the `aws` feature"));
        }
    };

    Ok(check)
}

/// Build every configured check, failing on the first invalid target
pub async fn build_checks(config: &Config) -> Result<Vec<Box<dyn Check>>, Error> {
    let mut checks = Vec::with_capacity(config.http_targets.len() + config.backup_targets.len());

    for target in &config.http_targets {
        checks.push(http_check(target)?);
    }
    for target in &config.backup_targets {
        checks.push(backup_check(target).await?);
    }

    Ok(checks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil::SeverityMode;

    fn config(raw: &str) -> Config {
        Config::parse(raw).unwrap()
    }

    #[test]
    fn test_http_policy_defaults() {
        let cfg = config("[[http]]\nname = \"api\"\nurl = \"https://api.example.com\"\n");
        let policy = http_policy(&cfg.http_targets[0]).unwrap();

        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.retries, 0);
        assert!(policy.attempt_spacing.is_zero());
        assert!(policy.latency_threshold.is_zero());
        assert!(policy.maintenance_windows.is_empty());
        assert_eq!(policy.severity, SeverityMode::Down);
    }

    #[test]
    fn test_http_policy_normalizes_negative_counts() {
        let cfg = config(
            r#"
[[http]]
name = "api"
url = "https://api.example.com"
attempts = -3
retries = -1
retry_spacing = "250ms"
latency_threshold = "1s"
severity = "degraded"

[[http.maintenance_windows]]
start = "01:00:00"
duration = "1h"
timezone = "UTC"
"#,
        );
        let policy = http_policy(&cfg.http_targets[0]).unwrap();

        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.retries, 0);
        assert_eq!(policy.retry_spacing, Duration::from_millis(250));
        assert_eq!(policy.latency_threshold, Duration::from_secs(1));
        assert_eq!(policy.severity, SeverityMode::Degraded);
        assert_eq!(policy.maintenance_windows.len(), 1);
        assert_eq!(policy.maintenance_windows[0].timezone.name(), "UTC");
    }

    #[test]
    fn test_bad_window_timezone_is_a_target_error() {
        let cfg = config(
            r#"
[[http]]
name = "api"
url = "https://api.example.com"

[[http.maintenance_windows]]
start = "01:00:00"
duration = "1h"
timezone = "Mars/Olympus"
"#,
        );
        assert!(matches!(http_policy(&cfg.http_targets[0]), Err(Error::InvalidTarget { .. })));
    }

    #[test]
    fn test_backup_policy_defaults_per_kind() {
        let cfg = config(
            r#"
[[backup]]
name = "dumps"
kind = "directory"
path = "/var/backups"

[[backup]]
name = "snapshots"
kind = "rds"
instance = "main-db"
min_age_threshold = "24h"
"#,
        );

        let dumps = backup_policy(&cfg.backup_targets[0]).unwrap();
        assert_eq!(dumps.min_age, DEFAULT_MIN_AGE);
        assert_eq!(dumps.min_size, Some(DEFAULT_MIN_SIZE));

        let snapshots = backup_policy(&cfg.backup_targets[1]).unwrap();
        assert_eq!(snapshots.min_age, Duration::from_secs(24 * 3600));
        assert_eq!(snapshots.min_size, None);
    }

    #[tokio::test]
    async fn test_invalid_url_fails_the_build() {
        let cfg = config("[[http]]\nname = \"api\"\nurl = \"not a url\"\n");
        assert!(matches!(build_checks(&cfg).await, Err(Error::InvalidTarget { .. })));
    }

    #[tokio::test]
    async fn test_build_checks_keeps_titles() {
        let cfg = config(
            r#"
[[http]]
name = "api"
url = "https://api.example.com"

[[backup]]
name = "dumps"
kind = "directory"
path = "/var/backups"
"#,
        );
        let checks = build_checks(&cfg).await.unwrap();
        let titles: Vec<_> = checks.iter().map(|c| c.title()).collect();
        assert_eq!(titles, vec!["api", "dumps"]);
    }
}
