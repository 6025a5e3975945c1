use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{error, info};
use vigil::{Check, CheckResult, Notifier};

/// Monitoring scheduler - runs every check once per interval and notifies
/// with the whole batch
pub struct Scheduler {
    checks: Vec<Box<dyn Check>>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(checks: Vec<Box<dyn Check>>, notifier: Arc<dyn Notifier>, interval: Duration) -> Self {
        Self { checks, notifier, interval }
    }

    /// Run all checks concurrently, notify once and return the results.
    ///
    /// Checks that fail to run are logged and left out of the batch, so
    /// their notification state is untouched.
    pub async fn run_cycle(&self) -> Vec<CheckResult> {
        let started = Instant::now();

        let outcomes = join_all(self.checks.iter().map(|check| async move { (check.title(), check.check().await) })).await;

        let mut results = Vec::with_capacity(outcomes.len());
        for (title, outcome) in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => error!("Check '{}' could not run: {}", title, e),
            }
        }

        if let Err(e) = self.notifier.notify(&results).await {
            error!("Failed to notify check results: {}", e);
        }

        let unhealthy = results.iter().filter(|r| !r.is_healthy()).count();
        info!(
            checks = results.len(),
            unhealthy,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "check cycle complete"
        );

        results
    }

    /// Run cycles forever, the first one immediately
    pub async fn run(&self) {
        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            self.run_cycle().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use vigil::{Attempt, CheckError, NotifyError, Status};

    use super::*;

    struct FixedCheck {
        title: &'static str,
        status: Option<Status>,
    }

    #[async_trait::async_trait]
    impl Check for FixedCheck {
        fn title(&self) -> &str {
            self.title
        }

        async fn check(&self) -> Result<CheckResult, CheckError> {
            let status = self.status.ok_or_else(|| CheckError::Client("no TLS backend".into()))?;
            Ok(CheckResult {
                title: self.title.to_string(),
                endpoint: format!("https://{}.example.com", self.title),
                timestamp: Utc::now(),
                attempts: vec![Attempt::success(Duration::from_millis(5))],
                threshold: Duration::ZERO,
                notice: None,
                status,
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        batches: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, results: &[CheckResult]) -> Result<(), NotifyError> {
            self.batches.lock().unwrap().push(results.iter().map(|r| r.title.clone()).collect());
            Ok(())
        }
    }

    fn scheduler(notifier: Arc<RecordingNotifier>) -> Scheduler {
        let checks: Vec<Box<dyn Check>> = vec![
            Box::new(FixedCheck { title: "web", status: Some(Status::Healthy) }),
            Box::new(FixedCheck { title: "broken", status: None }),
            Box::new(FixedCheck { title: "db", status: Some(Status::Down) }),
        ];
        Scheduler::new(checks, notifier, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_cycle_skips_checks_that_cannot_run() {
        let notifier = Arc::new(RecordingNotifier::default());
        let results = scheduler(notifier.clone()).run_cycle().await;

        let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["web", "db"]);
        assert_eq!(*notifier.batches.lock().unwrap(), vec![vec!["web".to_string(), "db".to_string()]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_once_per_interval() {
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = scheduler(notifier.clone());

        // Cycles at 0s, 60s and 120s
        let _ = tokio::time::timeout(Duration::from_secs(150), scheduler.run()).await;

        assert_eq!(notifier.batches.lock().unwrap().len(), 3);
    }
}
