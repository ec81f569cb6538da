//! Configuration for the limiter and the load harness.
//!
//! Every field has a serde default, so a partial JSON document (or `{}`)
//! yields a complete configuration. Defaults reproduce the reference load
//! profile: a 2000 tps limiter hit by 10000 requests per batch from two
//! workers, each request sleeping 1 ms before asking for admission.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use crate::rate_limiters::LeakyBucketCoreConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Limiter configuration
    #[serde(default)]
    pub limiter: LeakyBucketCoreConfig,

    /// Load harness configuration
    #[serde(default)]
    pub harness: HarnessConfig,
}

/// Load profile driven by [`LoadHarness`](crate::harness::LoadHarness).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Admission checks submitted per batch (default: 10000)
    #[serde(default = "default_requests_per_batch")]
    pub requests_per_batch: u64,

    /// Worker threads in the pool (default: 2)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Number of batches to run (default: 5)
    #[serde(default = "default_batches")]
    pub batches: usize,

    /// Per-request processing delay in milliseconds, spent before the
    /// limiter is touched (default: 1, 0 disables it)
    #[serde(default = "default_simulated_delay_ms")]
    pub simulated_delay_ms: u64,
}

fn default_requests_per_batch() -> u64 {
    10_000
}

fn default_concurrency() -> usize {
    2
}

fn default_batches() -> usize {
    5
}

fn default_simulated_delay_ms() -> u64 {
    1
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            requests_per_batch: default_requests_per_batch(),
            concurrency: default_concurrency(),
            batches: default_batches(),
            simulated_delay_ms: default_simulated_delay_ms(),
        }
    }
}

impl HarnessConfig {
    pub fn new(requests_per_batch: u64, concurrency: usize, batches: usize) -> Self {
        Self {
            requests_per_batch,
            concurrency,
            batches,
            ..Default::default()
        }
    }

    /// Sets the per-request delay.
    pub fn with_simulated_delay(mut self, delay: Duration) -> Self {
        self.simulated_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Per-request delay, `None` when disabled.
    pub fn simulated_delay(&self) -> Option<Duration> {
        (self.simulated_delay_ms > 0).then(|| Duration::from_millis(self.simulated_delay_ms))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.requests_per_batch == 0 {
            return Err(ConfigError::ZeroRequests);
        }
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.batches == 0 {
            return Err(ConfigError::ZeroBatches);
        }
        Ok(())
    }
}

impl Config {
    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limiter.validate()?;
        self.harness.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = Config::from_json_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.limiter.target_rate, 2000.0);
        assert_eq!(config.limiter.capacity(), 2001.0);
        assert_eq!(config.harness.requests_per_batch, 10_000);
        assert_eq!(config.harness.concurrency, 2);
        assert_eq!(config.harness.simulated_delay(), Some(Duration::from_millis(1)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document() {
        let config = Config::from_json_str(
            r#"{"limiter": {"target_rate": 100, "capacity": 10}, "harness": {"simulated_delay_ms": 0}}"#,
        )
        .unwrap();

        assert_eq!(config.limiter.target_rate, 100.0);
        assert_eq!(config.limiter.capacity(), 10.0);
        assert_eq!(config.harness.simulated_delay(), None);
        assert_eq!(config.harness.batches, 5);
    }

    #[test]
    fn test_validation_rejects_degenerate_values() {
        let mut config = Config::default();
        config.limiter.target_rate = -1.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidRate(-1.0)));

        let mut config = Config::default();
        config.limiter.capacity = Some(0.0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidCapacity(0.0)));

        assert_eq!(HarnessConfig::new(0, 2, 1).validate(), Err(ConfigError::ZeroRequests));
        assert_eq!(HarnessConfig::new(10, 0, 1).validate(), Err(ConfigError::ZeroConcurrency));
        assert_eq!(HarnessConfig::new(10, 2, 0).validate(), Err(ConfigError::ZeroBatches));
    }
}
