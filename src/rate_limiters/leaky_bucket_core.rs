use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::error::{AdmitResult, ConfigError, Overflow};
use crate::rate_limiter_core::RateLimiterCore;
use crate::types::{Millis, MILLIS_PER_SECOND};

/// Core implementation of the leaky bucket admission algorithm.
///
/// Every admitted call pours one token into the bucket, and the bucket drains
/// continuously at `target_rate / 1000` tokens per millisecond. A call is
/// refused while the fill level is at or above the burst capacity.
///
/// # Algorithm Behavior
///
/// - The bucket starts empty.
/// - Before each decision the level is drained for the time elapsed since the
///   previous decision, whether or not that decision admitted anything.
/// - A call is admitted while `level < capacity`, which adds exactly one token.
/// - A refused call leaves the level exactly where the drain put it.
///
/// The level and the last refill reading share one mutex owned by this
/// instance. Two limiters never contend with each other.
///
/// # Example
///
/// ```rust
/// use rate_guard_leaky::clock::ManualClock;
/// use rate_guard_leaky::rate_limiters::{LeakyBucketCore, LeakyBucketCoreConfig};
///
/// let clock = ManualClock::new(0);
/// // 100 tokens per second, burst capacity 101
/// let bucket = LeakyBucketCore::with_clock(LeakyBucketCoreConfig::new(100.0), clock.clone()).unwrap();
///
/// let admitted = (0..150).filter(|_| bucket.try_admit()).count();
/// assert_eq!(admitted, 101);
///
/// // 10 ms later one token has drained out
/// clock.advance(10);
/// assert!(bucket.try_admit());
/// assert!(!bucket.try_admit());
/// ```
#[derive(Debug)]
pub struct LeakyBucketCore<C: Clock = MonotonicClock> {
    /// Configured throughput in tokens per second.
    target_rate: f64,
    /// Tokens drained per millisecond. Derived once from `target_rate`.
    rate: f64,
    /// Fill level at which admission is refused.
    capacity: f64,
    /// Level and last refill, always updated together.
    state: Mutex<LeakyBucketCoreState>,
    clock: C,
}

/// Internal state of the leaky bucket.
#[derive(Debug)]
struct LeakyBucketCoreState {
    /// Current fill level. Never negative.
    level: f64,
    /// Clock reading of the last drain. Never moves backwards.
    last_refill: Millis,
}

impl LeakyBucketCoreState {
    /// Drains the bucket up to `now`.
    ///
    /// Returns the refused reading and the retained `last_refill` when `now`
    /// lies in the past; the level is left untouched in that case.
    #[inline(always)]
    fn drain(&mut self, now: Millis, rate: f64) -> Option<(Millis, Millis)> {
        if now < self.last_refill {
            return Some((now, self.last_refill));
        }

        let elapsed = (now - self.last_refill) as f64;
        self.level = (self.level - elapsed * rate).max(0.0);
        self.last_refill = now;
        None
    }
}

impl LeakyBucketCore<MonotonicClock> {
    /// Creates a bucket draining `target_rate` tokens per second with the
    /// default burst capacity of `target_rate + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRate`] if `target_rate` is not a
    /// positive, finite number.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rate_guard_leaky::rate_limiters::LeakyBucketCore;
    ///
    /// let bucket = LeakyBucketCore::new(2000.0).unwrap();
    /// assert_eq!(bucket.capacity(), 2001.0);
    /// assert!(LeakyBucketCore::new(0.0).is_err());
    /// ```
    pub fn new(target_rate: f64) -> Result<Self, ConfigError> {
        Self::with_clock(LeakyBucketCoreConfig::new(target_rate), MonotonicClock::new())
    }
}

impl<C: Clock> LeakyBucketCore<C> {
    /// Creates a bucket from a configuration and an explicit time source.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] reported by
    /// [`LeakyBucketCoreConfig::validate`].
    pub fn with_clock(config: LeakyBucketCoreConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;

        let last_refill = clock.now_millis();
        Ok(LeakyBucketCore {
            target_rate: config.target_rate,
            rate: config.target_rate / MILLIS_PER_SECOND,
            capacity: config.capacity(),
            state: Mutex::new(LeakyBucketCoreState {
                level: 0.0,
                last_refill,
            }),
            clock,
        })
    }

    /// Decides whether one call is admitted now.
    ///
    /// The clock is read after the lock is taken, so every decision sees the
    /// drain for all time up to the moment it entered the critical section.
    #[inline]
    pub fn try_admit(&self) -> bool {
        self.admit(None).is_ok()
    }

    /// Decides whether one call is admitted at the given clock reading.
    #[inline]
    pub fn try_admit_at(&self, now: Millis) -> bool {
        self.admit(Some(now)).is_ok()
    }

    /// Like [`try_admit`](Self::try_admit) but reports why a call was refused.
    #[inline]
    pub fn try_admit_verbose(&self) -> AdmitResult {
        self.admit(None)
    }

    /// Like [`try_admit_at`](Self::try_admit_at) but reports why a call was refused.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The call was admitted and one token was added.
    /// * `Err(Overflow)` - The bucket was full after draining; carries the
    ///   level, the capacity and how many milliseconds until a retry can
    ///   succeed.
    #[inline]
    pub fn try_admit_verbose_at(&self, now: Millis) -> AdmitResult {
        self.admit(Some(now))
    }

    fn admit(&self, tick: Option<Millis>) -> AdmitResult {
        let (outcome, regression) = {
            let mut state = self.state.lock();
            let now = tick.unwrap_or_else(|| self.clock.now_millis());
            let regression = state.drain(now, self.rate);

            let outcome = if state.level < self.capacity {
                state.level += 1.0;
                Ok(())
            } else {
                Err(Overflow {
                    level: state.level,
                    capacity: self.capacity,
                    retry_after_ms: self.retry_after(state.level),
                })
            };
            (outcome, regression)
        };

        // Logging happens after the lock is released.
        warn_regression(regression);
        if let Err(overflow) = &outcome {
            trace!(
                level = overflow.level,
                capacity = overflow.capacity,
                retry_after_ms = overflow.retry_after_ms,
                "admission refused"
            );
        }
        outcome
    }

    /// Whole milliseconds until `level` drains strictly below capacity.
    #[inline(always)]
    fn retry_after(&self, level: f64) -> Millis {
        ((level - self.capacity) / self.rate).floor() as Millis + 1
    }

    /// Drains the bucket up to `now` and returns the resulting level without
    /// admitting anything.
    pub fn level_at(&self, now: Millis) -> f64 {
        let (level, regression) = {
            let mut state = self.state.lock();
            let regression = state.drain(now, self.rate);
            (state.level, regression)
        };

        warn_regression(regression);
        level
    }

    /// Gets the current level without draining.
    pub fn current_level(&self) -> f64 {
        self.state.lock().level
    }

    /// Clock reading of the most recent drain.
    pub fn last_refill(&self) -> Millis {
        self.state.lock().last_refill
    }

    /// Configured throughput in tokens per second.
    pub fn target_rate(&self) -> f64 {
        self.target_rate
    }

    /// Tokens drained per millisecond.
    pub fn rate_per_ms(&self) -> f64 {
        self.rate
    }

    /// Burst capacity.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// The time source this bucket reads.
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<C: Clock> RateLimiterCore for LeakyBucketCore<C> {
    #[inline]
    fn try_admit(&self) -> bool {
        LeakyBucketCore::try_admit(self)
    }

    fn target_rate(&self) -> f64 {
        self.target_rate
    }

    fn capacity(&self) -> f64 {
        self.capacity
    }
}

fn warn_regression(regression: Option<(Millis, Millis)>) {
    if let Some((now, last_refill)) = regression {
        warn!(now, last_refill, "clock reading moved backwards, drain skipped");
    }
}

fn default_target_rate() -> f64 {
    2000.0
}

/// Configuration structure for creating a `LeakyBucketCore` limiter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakyBucketCoreConfig {
    /// Steady-state throughput in tokens per second (default: 2000)
    #[serde(default = "default_target_rate")]
    pub target_rate: f64,

    /// Burst capacity. Defaults to `target_rate + 1` when absent.
    #[serde(default)]
    pub capacity: Option<f64>,
}

impl LeakyBucketCoreConfig {
    /// Creates a configuration with the default burst capacity.
    pub fn new(target_rate: f64) -> Self {
        Self {
            target_rate,
            capacity: None,
        }
    }

    /// Overrides the burst capacity.
    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Effective burst capacity: the explicit value, or one token of slack
    /// above the nominal per-second target.
    pub fn capacity(&self) -> f64 {
        self.capacity.unwrap_or(self.target_rate + 1.0)
    }

    /// Checks that the rate and the effective capacity are positive and finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.target_rate.is_finite() && self.target_rate > 0.0) {
            return Err(ConfigError::InvalidRate(self.target_rate));
        }
        if let Some(capacity) = self.capacity {
            if !(capacity.is_finite() && capacity > 0.0) {
                return Err(ConfigError::InvalidCapacity(capacity));
            }
        }
        Ok(())
    }
}

impl Default for LeakyBucketCoreConfig {
    fn default() -> Self {
        Self::new(default_target_rate())
    }
}

impl TryFrom<LeakyBucketCoreConfig> for LeakyBucketCore {
    type Error = ConfigError;

    /// Converts a `LeakyBucketCoreConfig` into a `LeakyBucketCore` on the
    /// monotonic clock.
    ///
    /// ```
    /// use rate_guard_leaky::rate_limiters::{LeakyBucketCore, LeakyBucketCoreConfig};
    ///
    /// let limiter: LeakyBucketCore = LeakyBucketCoreConfig::new(500.0)
    ///     .with_capacity(50.0)
    ///     .try_into()
    ///     .unwrap();
    /// assert_eq!(limiter.capacity(), 50.0);
    /// ```
    fn try_from(config: LeakyBucketCoreConfig) -> Result<Self, Self::Error> {
        LeakyBucketCore::with_clock(config, MonotonicClock::new())
    }
}
