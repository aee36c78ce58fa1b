//! PostgreSQL vs Redis read benchmark.
//!
//! Reads `BenchConfig` from the environment (`TIERBENCH_LARGE_SCALE=1` starts
//! from the one-million-record preset), runs the driver against live
//! backends, prints the report and optionally writes it as JSON to
//! `TIERBENCH_REPORT_PATH`. Exits non-zero, naming the failed phase, when the
//! run aborts.

use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use tierbench_api::telemetry::{init_tracing, TelemetryConfig};
use tierbench_api::{connect_backends, ApiError};
use tierbench_bench::{BenchConfig, BenchError, BenchmarkDriver, BenchmarkReport};
use tierbench_core::TierError;
use tierbench_storage::{CacheStore, DurableStore, RecordAccessLayer};

#[derive(Debug, Error)]
enum RunError {
    #[error("startup failed: {0}")]
    Startup(#[from] ApiError),

    #[error("could not connect backends: {0}")]
    Connect(#[from] TierError),

    #[error("benchmark aborted: {0}")]
    Bench(#[from] BenchError),

    #[error("could not encode report: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("could not write report to {path}: {source}")]
    Report {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn bench_config_from_env() -> BenchConfig {
    let large = std::env::var("TIERBENCH_LARGE_SCALE")
        .map(|s| s == "true" || s == "1")
        .unwrap_or(false);
    if !large {
        return BenchConfig::from_env();
    }

    // Explicit variables still override the preset.
    let env = BenchConfig::from_env();
    let defaults = BenchConfig::default();
    let mut config = BenchConfig::large_scale();
    if env.records != defaults.records {
        config.records = env.records;
    }
    if env.reads != defaults.reads {
        config.reads = env.reads;
    }
    if env.warm_records != defaults.warm_records {
        config.warm_records = env.warm_records;
    }
    if env.batch_size != defaults.batch_size {
        config.batch_size = env.batch_size;
    }
    if env.phase_timeout != defaults.phase_timeout {
        config.phase_timeout = env.phase_timeout;
    }
    config.seed = env.seed;
    config
}

fn write_report(report: &BenchmarkReport) -> Result<(), RunError> {
    let Ok(path) = std::env::var("TIERBENCH_REPORT_PATH") else {
        return Ok(());
    };
    let json = report.to_json()?;
    std::fs::write(&path, json).map_err(|source| RunError::Report {
        path: path.clone(),
        source,
    })?;
    tracing::info!(%path, "JSON report written");
    Ok(())
}

async fn run() -> Result<BenchmarkReport, RunError> {
    init_tracing(&TelemetryConfig::from_env("tierbench-run"))?;

    let config = bench_config_from_env();
    let (durable, cache, access_config) = connect_backends().await?;
    let durable: Arc<dyn DurableStore> = durable;
    let cache: Arc<dyn CacheStore> = cache;
    let layer = RecordAccessLayer::new(durable, cache, access_config);

    let report = BenchmarkDriver::new(layer, config)?.run().await?;
    println!("{}", report);
    write_report(&report)?;
    Ok(report)
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(report) if report.cleanup.is_clean() => ExitCode::SUCCESS,
        Ok(_) => {
            eprintln!("benchmark completed but cleanup was incomplete");
            ExitCode::SUCCESS
        }
        Err(RunError::Bench(err)) => {
            match err.phase() {
                Some(phase) => eprintln!("benchmark aborted during {}: {}", phase, err),
                None => eprintln!("benchmark not started: {}", err),
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
