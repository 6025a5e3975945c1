use chrono::Utc;
use tracing::debug;

use super::executor::AttemptExecutor;
use super::policy::Policy;
use super::types::CheckResult;
use super::verdict::{evaluate, evaluate_backup};
use crate::error::CheckError;
use crate::probe::{BackupCatalog, BackupPolicy, Probe};

/// One target that can be checked, producing one result per call
#[async_trait::async_trait]
pub trait Check: Send + Sync {
    /// Name of the target, unique across a configuration
    fn title(&self) -> &str;

    /// Run the check. Only setup failures are errors; an unhealthy target is
    /// an `Ok` result with a down or degraded status.
    async fn check(&self) -> Result<CheckResult, CheckError>;
}

/// Endpoint probed through attempts, retries and the full verdict policy
pub struct EndpointCheck<P> {
    title: String,
    probe: P,
    policy: Policy,
}

impl<P: Probe> EndpointCheck<P> {
    pub fn new(title: impl Into<String>, probe: P, policy: Policy) -> Self {
        Self { title: title.into(), probe, policy }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }
}

#[async_trait::async_trait]
impl<P: Probe> Check for EndpointCheck<P> {
    fn title(&self) -> &str {
        &self.title
    }

    async fn check(&self) -> Result<CheckResult, CheckError> {
        let timestamp = Utc::now();
        let attempts = AttemptExecutor::new(&self.policy).run(&self.title, &self.probe).await;
        let verdict = evaluate(&attempts, &self.policy, Utc::now());

        debug!(target_title = %self.title, status = %verdict.status, "endpoint check concluded");

        Ok(CheckResult {
            title: self.title.clone(),
            endpoint: self.probe.endpoint().to_string(),
            timestamp,
            attempts,
            threshold: self.policy.latency_threshold,
            notice: verdict.notice,
            status: verdict.status,
        })
    }
}

/// Backup catalog judged on its newest available item
pub struct BackupCheck<C> {
    title: String,
    catalog: C,
    policy: BackupPolicy,
}

impl<C: BackupCatalog> BackupCheck<C> {
    pub fn new(title: impl Into<String>, catalog: C, policy: BackupPolicy) -> Self {
        Self { title: title.into(), catalog, policy }
    }
}

#[async_trait::async_trait]
impl<C: BackupCatalog> Check for BackupCheck<C> {
    fn title(&self) -> &str {
        &self.title
    }

    async fn check(&self) -> Result<CheckResult, CheckError> {
        let timestamp = Utc::now();
        let items = self.catalog.list().await?;
        let (attempt, verdict) = evaluate_backup(&items, &self.policy, Utc::now());

        debug!(
            target_title = %self.title,
            items = items.len(),
            status = %verdict.status,
            "backup check concluded"
        );

        Ok(CheckResult {
            title: self.title.clone(),
            endpoint: self.catalog.endpoint().to_string(),
            timestamp,
            attempts: vec![attempt],
            threshold: std::time::Duration::ZERO,
            notice: verdict.notice,
            status: verdict.status,
        })
    }
}
