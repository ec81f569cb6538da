//! Core trait for admission-control primitives.
//!
//! The load harness drives any implementor of this trait, so the leaky bucket
//! can be measured next to test doubles that misbehave on purpose.

/// The core trait implemented by admission-control primitives.
///
/// Each implementor guards exactly one resource and must be safe to share
/// between worker threads.
pub trait RateLimiterCore: Send + Sync {
    /// Decides whether one unit of work may proceed right now.
    ///
    /// # Returns
    /// * `true` if the unit is admitted
    /// * `false` if it overflows the configured rate
    fn try_admit(&self) -> bool;

    /// Configured steady-state throughput in tokens per second.
    fn target_rate(&self) -> f64;

    /// Burst capacity the primitive tolerates before refusing work.
    fn capacity(&self) -> f64;
}
