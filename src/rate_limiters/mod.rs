//! Admission-control algorithm implementations.
//!
//! Each core is a thread-safe, low-level primitive guarding exactly one
//! resource. Cores own their lock; no state is shared between instances.
//!
//! # Available Algorithms
//!
//! - **[`LeakyBucketCore`]** - Continuous drain at a fixed rate with a burst
//!   ceiling; admission is refused while the bucket is full.

pub mod leaky_bucket_core;
pub use leaky_bucket_core::LeakyBucketCore;
pub use leaky_bucket_core::LeakyBucketCoreConfig;
