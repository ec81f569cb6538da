//! Time and identity aliases shared by the limiter and the harness.

/// Milliseconds since an arbitrary, clock-specific epoch.
///
/// Every limiter reading is expressed in this unit, so bursts shorter than
/// one millisecond are not individually distinguishable.
pub type Millis = u64;

/// Opaque identity of one synthetic request inside a batch.
pub type RequestId = u64;

/// Number of milliseconds in one second, used when converting a
/// tokens-per-second target into a per-millisecond drain rate.
pub const MILLIS_PER_SECOND: f64 = 1000.0;
