//! Leaky-bucket admission control with a concurrent load harness.
//!
//! The library answers one question for one guarded resource: "may this unit
//! of work proceed right now?" It also ships the harness used to check that
//! the answer holds the configured rate when many threads ask at once.
//!
//! # Quick Start
//!
//! ```rust
//! use rate_guard_leaky::LeakyBucketCore;
//!
//! // Drain 100 tokens per second; burst capacity defaults to 101
//! let limiter = LeakyBucketCore::new(100.0).unwrap();
//!
//! if limiter.try_admit() {
//!     println!("Request allowed");
//! } else {
//!     println!("Request overflowed");
//! }
//! ```
//!
//! # Core Concepts
//!
//! ## Time Representation
//! The limiter reads a millisecond [`Clock`](clock::Clock). Production code
//! uses [`MonotonicClock`](clock::MonotonicClock); tests drive a
//! [`ManualClock`](clock::ManualClock) and can also pass explicit readings
//! to [`LeakyBucketCore::try_admit_at`].
//!
//! ## Error Handling
//! - Construction rejects invalid parameters with [`ConfigError`].
//! - A refused admission is a plain `false`, or an [`Overflow`] carrying a
//!   retry hint from the verbose variants.
//! - A clock reading that moves backwards is absorbed: the level is never
//!   raised and a warning is logged.
//!
//! ## Thread Safety
//! Each limiter owns exactly one lock covering its fill level and last
//! refill reading. The critical section never sleeps and never performs I/O.
//!
//! # Load Harness
//!
//! [`LoadHarness`] submits batches of synthetic requests to a bounded
//! [`WorkerPool`](harness::WorkerPool) and yields one
//! [`BatchMetrics`] per batch, comparing observed admissions with the
//! configured rate.

pub mod clock;
pub mod config;
pub mod error;
pub mod harness;
pub mod rate_limiter_core;
pub mod rate_limiters;
pub mod types;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{Config, HarnessConfig};
pub use error::{AdmitResult, ConfigError, Overflow};
pub use harness::{BatchMetrics, LoadHarness};
pub use rate_limiter_core::RateLimiterCore;
pub use rate_limiters::{LeakyBucketCore, LeakyBucketCoreConfig};
pub use types::{Millis, RequestId};
