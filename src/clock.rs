//! Millisecond time sources for the limiter.
//!
//! The limiter never reads the system time directly; it asks a [`Clock`].
//! [`MonotonicClock`] is the production source. [`ManualClock`] is a shared,
//! hand-driven source that makes decay arithmetic reproducible in tests.

use crate::types::Millis;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A source of millisecond readings.
pub trait Clock: Send + Sync {
    /// Current reading in milliseconds since the clock's own epoch.
    fn now_millis(&self) -> Millis;
}

/// Monotonic wall-clock source anchored at its construction instant.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_millis(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}

/// Manually driven clock. Clones share the same reading, so a test can keep
/// one handle while the limiter owns another.
///
/// ```rust
/// use rate_guard_leaky::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new(0);
/// let handle = clock.clone();
/// handle.advance(250);
/// assert_eq!(clock.now_millis(), 250);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Moves the reading forward by `millis`.
    pub fn advance(&self, millis: Millis) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    /// Sets an absolute reading. May move time backwards.
    pub fn set(&self, millis: Millis) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now_millis(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}
