//! Latency statistics over the attempts of one check.

use std::time::Duration;

use super::types::Attempt;

/// Aggregate latency of the successful attempts of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total: Duration,
    pub mean: Duration,
    pub median: Duration,
    pub min: Duration,
    pub max: Duration,
    /// Number of attempts that contributed to the sample
    pub successes: usize,
}

impl Stats {
    /// Compute statistics over successful attempts only.
    ///
    /// Returns `None` when no attempt succeeded; callers must then skip any
    /// latency comparison.
    pub fn compute(attempts: &[Attempt]) -> Option<Self> {
        let mut sample: Vec<Duration> =
            attempts.iter().filter(|a| a.is_success()).map(|a| a.latency).collect();

        if sample.is_empty() {
            return None;
        }

        sample.sort_unstable();
        let count = sample.len();
        let total: Duration = sample.iter().sum();

        let median = if count % 2 == 0 {
            (sample[count / 2 - 1] + sample[count / 2]) / 2
        } else {
            sample[count / 2]
        };

        Some(Self {
            total,
            mean: total / count as u32,
            median,
            min: sample[0],
            max: sample[count - 1],
            successes: count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(values: &[u64]) -> Vec<Attempt> {
        values.iter().map(|v| Attempt::success(Duration::from_millis(*v))).collect()
    }

    #[test]
    fn test_median_odd_sample() {
        let stats = Stats::compute(&ms(&[30, 10, 20])).unwrap();
        assert_eq!(stats.median, Duration::from_millis(20));
        assert_eq!(stats.min, Duration::from_millis(10));
        assert_eq!(stats.max, Duration::from_millis(30));
        assert_eq!(stats.mean, Duration::from_millis(20));
    }

    #[test]
    fn test_median_even_sample_averages_middle_values() {
        let stats = Stats::compute(&ms(&[20, 10])).unwrap();
        assert_eq!(stats.median, Duration::from_millis(15));
        assert_eq!(stats.total, Duration::from_millis(30));
    }

    #[test]
    fn test_failed_attempts_are_excluded() {
        let mut attempts = ms(&[10, 40]);
        attempts.push(Attempt { latency: Duration::from_secs(9), error: Some("timeout".into()) });

        let stats = Stats::compute(&attempts).unwrap();
        assert_eq!(stats.successes, 2);
        assert_eq!(stats.median, Duration::from_millis(25));
        assert_eq!(stats.max, Duration::from_millis(40));
    }

    #[test]
    fn test_all_failures_is_undefined() {
        let attempts = vec![Attempt::failure("refused"), Attempt::failure("refused")];
        assert!(Stats::compute(&attempts).is_none());
        assert!(Stats::compute(&[]).is_none());
    }
}
