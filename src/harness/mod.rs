//! Concurrent load harness for admission-control primitives.
//!
//! The harness offers traffic faster than the limiter's configured rate and
//! measures how much of it got through. Each batch submits a fixed number of
//! synthetic requests to a bounded [`WorkerPool`]; every request optionally
//! sleeps for a simulated processing delay, asks the limiter for admission and
//! records its id as accepted or overflowed. Result collections belong to a
//! single batch and are dropped with it.
//!
//! ```rust
//! use std::sync::Arc;
//! use rate_guard_leaky::config::HarnessConfig;
//! use rate_guard_leaky::harness::LoadHarness;
//! use rate_guard_leaky::rate_limiters::LeakyBucketCore;
//!
//! let limiter = Arc::new(LeakyBucketCore::new(1000.0).unwrap());
//! let config = HarnessConfig::new(500, 2, 2);
//! let harness = LoadHarness::new(limiter, config).unwrap();
//!
//! for metrics in harness.run() {
//!     assert!(metrics.is_accounted());
//! }
//! ```

pub mod metrics;
pub mod pool;

pub use metrics::{BatchMetrics, BatchOutcome};
pub use pool::WorkerPool;

use parking_lot::Mutex;
use std::iter::FusedIterator;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::error::ConfigError;
use crate::rate_limiter_core::RateLimiterCore;
use crate::types::RequestId;

/// Drives batches of concurrent admission checks against one limiter.
pub struct LoadHarness<L: RateLimiterCore + ?Sized> {
    limiter: Arc<L>,
    config: HarnessConfig,
    pool: WorkerPool,
}

/// Append-only outcome collections of a single batch.
#[derive(Debug)]
struct BatchResults {
    accepted: Mutex<Vec<RequestId>>,
    overflowed: Mutex<Vec<RequestId>>,
}

impl BatchResults {
    fn with_capacity(requests: usize) -> Self {
        Self {
            accepted: Mutex::new(Vec::with_capacity(requests)),
            overflowed: Mutex::new(Vec::with_capacity(requests)),
        }
    }

    fn record(&self, id: RequestId, admitted: bool) {
        if admitted {
            self.accepted.lock().push(id);
        } else {
            self.overflowed.lock().push(id);
        }
    }

    fn outcome(&self, requests: u64, failed: usize, elapsed: Duration) -> BatchOutcome {
        BatchOutcome {
            requests,
            accepted: self.accepted.lock().len() as u64,
            overflowed: self.overflowed.lock().len() as u64,
            failed: failed as u64,
            elapsed,
        }
    }
}

impl<L: RateLimiterCore + ?Sized> LoadHarness<L> {
    /// # Errors
    ///
    /// Returns the [`ConfigError`] reported by [`HarnessConfig::validate`].
    pub fn new(limiter: Arc<L>, config: HarnessConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = WorkerPool::new(config.concurrency)?;
        Ok(Self {
            limiter,
            config,
            pool,
        })
    }

    /// Returns the lazy sequence of batches. Each call to `next` runs one
    /// batch to completion before yielding its metrics.
    pub fn run(&self) -> Batches<'_, L> {
        Batches {
            harness: self,
            next: 0,
        }
    }

    /// Runs a single batch and blocks until every request has recorded an
    /// outcome.
    pub fn run_batch(&self, batch: usize) -> BatchMetrics {
        let requests = self.config.requests_per_batch;
        debug!(
            batch,
            requests,
            concurrency = self.pool.workers(),
            "starting batch"
        );

        let (results, failed, elapsed) = self.execute_batch();
        let outcome = results.outcome(requests, failed, elapsed);
        let metrics = BatchMetrics::from_outcome(
            batch,
            outcome,
            self.limiter.target_rate(),
            self.limiter.capacity(),
        );

        info!(
            batch,
            elapsed_ms = metrics.elapsed_ms,
            observed_tps = metrics.observed_tps,
            theoretical_admitted = metrics.theoretical_admitted,
            delta = metrics.delta,
            accepted = metrics.accepted,
            overflowed = metrics.overflowed,
            failed = metrics.failed,
            "batch complete"
        );
        metrics
    }

    fn execute_batch(&self) -> (BatchResults, usize, Duration) {
        let requests = self.config.requests_per_batch;
        let delay = self.config.simulated_delay();
        let results = BatchResults::with_capacity(requests as usize);

        let started = Instant::now();
        let failed = self.pool.execute(requests, |id| {
            if let Some(delay) = delay {
                thread::sleep(delay);
            }
            results.record(id, self.limiter.try_admit());
        });

        (results, failed, started.elapsed())
    }

    pub fn limiter(&self) -> &Arc<L> {
        &self.limiter
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }
}

/// Finite, lazily evaluated sequence of batch metrics.
pub struct Batches<'a, L: RateLimiterCore + ?Sized> {
    harness: &'a LoadHarness<L>,
    next: usize,
}

impl<L: RateLimiterCore + ?Sized> Iterator for Batches<'_, L> {
    type Item = BatchMetrics;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.harness.config.batches {
            return None;
        }
        let metrics = self.harness.run_batch(self.next);
        self.next += 1;
        Some(metrics)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.harness.config.batches.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl<L: RateLimiterCore + ?Sized> ExactSizeIterator for Batches<'_, L> {}

impl<L: RateLimiterCore + ?Sized> FusedIterator for Batches<'_, L> {}
