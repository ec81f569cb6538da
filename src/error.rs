//! error.rs
//! Configuration errors and the verbose overflow rejection.

use crate::types::Millis;
use thiserror::Error;

/// Rejected construction parameters. A limiter or harness is never built
/// in an invalid state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Target rate is zero, negative, NaN or infinite.
    #[error("target rate must be a positive, finite number of tokens per second (got {0})")]
    InvalidRate(f64),
    /// Explicit burst capacity is zero, negative, NaN or infinite.
    #[error("burst capacity must be a positive, finite number of tokens (got {0})")]
    InvalidCapacity(f64),
    #[error("requests per batch must be greater than 0")]
    ZeroRequests,
    #[error("concurrency must be greater than 0")]
    ZeroConcurrency,
    #[error("batch count must be greater than 0")]
    ZeroBatches,
}

/// Verbose rejection returned when the bucket is full.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "bucket overflow: level {level:.3} reached capacity {capacity:.3}, retry after {retry_after_ms} ms"
)]
pub struct Overflow {
    /// Fill level after decay, at the moment of rejection.
    pub level: f64,
    /// Configured burst capacity.
    pub capacity: f64,
    /// Whole milliseconds until the level drops below capacity again.
    pub retry_after_ms: Millis,
}

/// Result type for verbose admission checks.
pub type AdmitResult = Result<(), Overflow>;
