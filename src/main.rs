//! Load-test driver for the leaky-bucket limiter.
//!
//! Builds one limiter from operator input, hammers it with the configured
//! load profile and reports every batch. Flags override values from an
//! optional JSON configuration file.
//!
//! ```text
//! rate-guard-leaky --tps 2000 --requests 10000 --concurrency 2 --batches 5
//! RUST_LOG=debug rate-guard-leaky --config load.json --json
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use rate_guard_leaky::{Config, LeakyBucketCore, LoadHarness};

#[derive(Parser)]
#[command(name = "rate-guard-leaky", about = "Drive concurrent load through a leaky-bucket limiter")]
struct Args {
    /// JSON configuration file; flags take precedence over its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target throughput in tokens per second
    #[arg(long)]
    tps: Option<f64>,

    /// Burst capacity (default: tps + 1)
    #[arg(long)]
    capacity: Option<f64>,

    /// Requests submitted per batch
    #[arg(long)]
    requests: Option<u64>,

    /// Worker threads
    #[arg(long)]
    concurrency: Option<usize>,

    /// Number of batches
    #[arg(long)]
    batches: Option<usize>,

    /// Simulated per-request delay in milliseconds (0 disables it)
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Print each batch as a JSON line on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    config.validate().context("invalid configuration")?;

    let limiter: LeakyBucketCore = config.limiter.clone().try_into()?;
    let limiter = Arc::new(limiter);
    info!(
        target_rate = limiter.target_rate(),
        capacity = limiter.capacity(),
        requests_per_batch = config.harness.requests_per_batch,
        concurrency = config.harness.concurrency,
        batches = config.harness.batches,
        simulated_delay_ms = config.harness.simulated_delay_ms,
        "starting load run"
    );

    let harness = LoadHarness::new(limiter, config.harness)?;
    for metrics in harness.run() {
        if args.json {
            println!("{}", serde_json::to_string(&metrics)?);
        } else {
            info!("{metrics}");
        }
    }

    Ok(())
}

/// Reads the optional configuration file and applies flag overrides.
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            Config::from_json_str(&raw)
                .with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(tps) = args.tps {
        config.limiter.target_rate = tps;
    }
    if let Some(capacity) = args.capacity {
        config.limiter.capacity = Some(capacity);
    }
    if let Some(requests) = args.requests {
        config.harness.requests_per_batch = requests;
    }
    if let Some(concurrency) = args.concurrency {
        config.harness.concurrency = concurrency;
    }
    if let Some(batches) = args.batches {
        config.harness.batches = batches;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.harness.simulated_delay_ms = delay_ms;
    }

    Ok(config)
}
