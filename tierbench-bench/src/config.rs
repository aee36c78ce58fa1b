//! Benchmark configuration.
//!
//! Loaded from environment variables with defaults suited to a local
//! PostgreSQL + Redis pair:
//!
//! - `TIERBENCH_RECORDS`: records created during population (default: 100000)
//! - `TIERBENCH_READS`: timed reads per tier (default: 10000)
//! - `TIERBENCH_WARM_RECORDS`: records copied into the cache (default: 10000)
//! - `TIERBENCH_BATCH_SIZE`: max in-flight operations per batch (default: 1000)
//! - `TIERBENCH_SEED`: RNG seed for reproducible access patterns (default: random)
//! - `TIERBENCH_PHASE_TIMEOUT_SECS`: wall-clock bound per phase (default: 600)

use std::time::Duration;

use crate::error::{BenchError, BenchResult};

/// Tunable parameters of a benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    /// Number of synthetic records inserted (N).
    pub records: usize,
    /// Number of timed reads issued against each tier (M).
    pub reads: usize,
    /// Size of the cache-resident subset.
    pub warm_records: usize,
    /// Upper bound on concurrently in-flight operations during batched phases.
    pub batch_size: usize,
    /// Seed for id selection; `None` picks one at random and reports it.
    pub seed: Option<u64>,
    /// Wall-clock limit applied to each phase separately.
    pub phase_timeout: Duration,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            records: 100_000,
            reads: 10_000,
            warm_records: 10_000,
            batch_size: 1_000,
            seed: None,
            phase_timeout: Duration::from_secs(600),
        }
    }
}

impl BenchConfig {
    /// Create a new benchmark config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// The one-million-record variant.
    pub fn large_scale() -> Self {
        Self {
            records: 1_000_000,
            reads: 100_000,
            warm_records: 100_000,
            batch_size: 1_000,
            seed: None,
            phase_timeout: Duration::from_secs(3600),
        }
    }

    /// Create a config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            records: env_parse("TIERBENCH_RECORDS").unwrap_or(defaults.records),
            reads: env_parse("TIERBENCH_READS").unwrap_or(defaults.reads),
            warm_records: env_parse("TIERBENCH_WARM_RECORDS").unwrap_or(defaults.warm_records),
            batch_size: env_parse("TIERBENCH_BATCH_SIZE").unwrap_or(defaults.batch_size),
            seed: env_parse("TIERBENCH_SEED"),
            phase_timeout: env_parse("TIERBENCH_PHASE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.phase_timeout),
        }
    }

    /// Set the population size.
    pub fn with_records(mut self, records: usize) -> Self {
        self.records = records;
        self
    }

    /// Set the number of timed reads per tier.
    pub fn with_reads(mut self, reads: usize) -> Self {
        self.reads = reads;
        self
    }

    /// Set the cache-resident subset size.
    pub fn with_warm_records(mut self, warm_records: usize) -> Self {
        self.warm_records = warm_records;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Fix the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the per-phase timeout.
    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = timeout;
        self
    }

    /// Reject configurations that cannot produce meaningful statistics.
    pub fn validate(&self) -> BenchResult<()> {
        if self.records == 0 {
            return Err(BenchError::invalid_config("records must be at least 1"));
        }
        if self.reads == 0 {
            return Err(BenchError::invalid_config("reads must be at least 1"));
        }
        if self.warm_records == 0 {
            return Err(BenchError::invalid_config("warm_records must be at least 1"));
        }
        if self.warm_records > self.records {
            return Err(BenchError::invalid_config(format!(
                "warm_records ({}) exceeds records ({})",
                self.warm_records, self.records
            )));
        }
        if self.batch_size == 0 {
            return Err(BenchError::invalid_config("batch_size must be at least 1"));
        }
        if self.phase_timeout.is_zero() {
            return Err(BenchError::invalid_config("phase_timeout must be non-zero"));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
