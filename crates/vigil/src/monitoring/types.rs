use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verdict of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    Degraded,
    Down,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Healthy => write!(f, "healthy"),
            Status::Degraded => write!(f, "degraded"),
            Status::Down => write!(f, "down"),
        }
    }
}

/// Outcome of one probe attempt
///
/// `error` is authoritative: an attempt with an error is a failure even if
/// some latency was recorded for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    #[serde(rename = "latency_ms", with = "duration_ms")]
    pub latency: Duration,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Attempt {
    /// A successful attempt that took `latency`
    pub fn success(latency: Duration) -> Self {
        Self { latency, error: None }
    }

    /// A failed attempt
    pub fn failure(reason: impl Into<String>) -> Self {
        Self { latency: Duration::ZERO, error: Some(reason.into()) }
    }

    pub fn is_success(&self) -> bool {
        self.error.as_deref().is_none_or(str::is_empty)
    }
}

/// Result of one check of one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Name of the target, also the debounce key
    pub title: String,

    /// URL or catalog identifier that was checked
    pub endpoint: String,

    /// When the check started
    pub timestamp: DateTime<Utc>,

    /// Every top-level attempt, in order
    pub attempts: Vec<Attempt>,

    /// Latency threshold the result was judged against (zero when disabled)
    #[serde(rename = "threshold_ms", with = "duration_ms")]
    pub threshold: Duration,

    /// Human readable explanation for a degraded verdict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,

    pub status: Status,
}

impl CheckResult {
    pub fn is_healthy(&self) -> bool {
        self.status == Status::Healthy
    }

    /// First failure reason among the attempts, if any
    pub fn first_error(&self) -> Option<&str> {
        self.attempts.iter().find(|a| !a.is_success()).and_then(|a| a.error.as_deref())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(ms.max(0.0) / 1000.0))
    }
}
