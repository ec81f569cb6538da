//! Per-batch measurements of a limiter under load.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::types::MILLIS_PER_SECOND;

/// Raw outcome counts of one finished batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Requests submitted to the pool.
    pub requests: u64,
    /// Requests the limiter admitted.
    pub accepted: u64,
    /// Requests the limiter refused.
    pub overflowed: u64,
    /// Requests whose task panicked before recording an outcome.
    pub failed: u64,
    /// Wall-clock duration of the batch.
    pub elapsed: Duration,
}

/// Summary of one batch compared against the limiter's configured rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchMetrics {
    /// Zero-based batch index.
    pub batch: usize,
    pub requests: u64,
    pub accepted: u64,
    pub overflowed: u64,
    pub failed: u64,
    /// Wall-clock duration of the batch in whole milliseconds.
    pub elapsed_ms: u64,
    /// Requests per second the harness offered.
    pub observed_tps: f64,
    /// Admissions the configured rate allows over `elapsed_ms`.
    pub theoretical_admitted: u64,
    /// `accepted - theoretical_admitted`.
    pub delta: i64,
    /// Hard upper bound on admissions: a full burst plus the drain over
    /// `elapsed_ms`.
    pub admission_ceiling: f64,
}

impl BatchMetrics {
    /// Derives batch metrics from raw counts and the limiter's configuration.
    pub fn from_outcome(batch: usize, outcome: BatchOutcome, target_rate: f64, capacity: f64) -> Self {
        let elapsed_ms = outcome.elapsed.as_millis() as u64;
        let elapsed_secs = elapsed_ms as f64 / MILLIS_PER_SECOND;

        let observed_tps = if elapsed_ms > 0 {
            (outcome.requests as f64 / elapsed_ms as f64 * MILLIS_PER_SECOND).round()
        } else {
            0.0
        };
        let theoretical_admitted = (elapsed_secs * target_rate).round() as u64;

        Self {
            batch,
            requests: outcome.requests,
            accepted: outcome.accepted,
            overflowed: outcome.overflowed,
            failed: outcome.failed,
            elapsed_ms,
            observed_tps,
            theoretical_admitted,
            delta: outcome.accepted as i64 - theoretical_admitted as i64,
            admission_ceiling: capacity + target_rate / MILLIS_PER_SECOND * elapsed_ms as f64,
        }
    }

    /// Every submitted request landed in exactly one bucket.
    pub fn is_accounted(&self) -> bool {
        self.accepted + self.overflowed + self.failed == self.requests
    }

    /// Admissions stayed under the ceiling, allowing `tolerance` extra tokens
    /// for clock granularity.
    pub fn within_ceiling(&self, tolerance: f64) -> bool {
        self.accepted as f64 <= self.admission_ceiling + tolerance
    }

    /// Share of requests the limiter refused.
    pub fn overflow_ratio(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        self.overflowed as f64 / self.requests as f64
    }
}

impl fmt::Display for BatchMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch {}: {} ms, offered {:.0} tps, accepted {} (theoretical {}, delta {:+}), overflowed {}, failed {}",
            self.batch,
            self.elapsed_ms,
            self.observed_tps,
            self.accepted,
            self.theoretical_admitted,
            self.delta,
            self.overflowed,
            self.failed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(accepted: u64, overflowed: u64, failed: u64, elapsed_ms: u64) -> BatchOutcome {
        BatchOutcome {
            requests: accepted + overflowed + failed,
            accepted,
            overflowed,
            failed,
            elapsed: Duration::from_millis(elapsed_ms),
        }
    }

    #[test]
    fn test_metrics_against_reference_profile() {
        // 10000 requests in 2500 ms against a 2000 tps limiter
        let metrics = BatchMetrics::from_outcome(0, outcome(5030, 4970, 0, 2500), 2000.0, 2001.0);

        assert_eq!(metrics.elapsed_ms, 2500);
        assert_eq!(metrics.observed_tps, 4000.0);
        assert_eq!(metrics.theoretical_admitted, 5000);
        assert_eq!(metrics.delta, 30);
        assert_eq!(metrics.admission_ceiling, 7001.0);
        assert!(metrics.is_accounted());
        assert!(metrics.within_ceiling(0.0));
        assert!((metrics.overflow_ratio() - 0.497).abs() < 1e-9);
    }

    #[test]
    fn test_negative_delta_and_rounding() {
        let metrics = BatchMetrics::from_outcome(3, outcome(10, 0, 0, 333), 100.0, 101.0);

        // 0.333 s * 100 tps = 33.3 -> 33
        assert_eq!(metrics.theoretical_admitted, 33);
        assert_eq!(metrics.delta, -23);
        // 10 / 333 ms * 1000 = 30.03 -> 30
        assert_eq!(metrics.observed_tps, 30.0);
    }

    #[test]
    fn test_zero_elapsed_batch() {
        let metrics = BatchMetrics::from_outcome(0, outcome(5, 5, 0, 0), 100.0, 101.0);

        assert_eq!(metrics.observed_tps, 0.0);
        assert_eq!(metrics.theoretical_admitted, 0);
        assert_eq!(metrics.admission_ceiling, 101.0);
    }

    #[test]
    fn test_failed_tasks_still_accounted() {
        let metrics = BatchMetrics::from_outcome(0, outcome(4, 3, 3, 10), 100.0, 101.0);
        assert!(metrics.is_accounted());

        let mut broken = metrics.clone();
        broken.failed = 0;
        assert!(!broken.is_accounted());
    }

    #[test]
    fn test_display() {
        let metrics = BatchMetrics::from_outcome(1, outcome(7, 3, 0, 100), 50.0, 51.0);
        assert_eq!(
            metrics.to_string(),
            "batch 1: 100 ms, offered 100 tps, accepted 7 (theoretical 5, delta +2), overflowed 3, failed 0"
        );
    }
}
