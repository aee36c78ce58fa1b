//! TIERBENCH Bench - PostgreSQL vs Redis Read Benchmark
//!
//! Generates a synthetic dataset, populates the durable tier through the
//! cache-aside access layer, warms a subset into the cache, times sequential
//! point reads against each tier and aggregates the samples into a
//! comparison report.
//!
//! Population, warm-up and cleanup run through [`BatchExecutor`] so that no
//! more than `batch_size` operations are ever in flight.

pub mod batch;
pub mod config;
pub mod dataset;
pub mod driver;
pub mod error;
pub mod report;
pub mod stats;

pub use batch::BatchExecutor;
pub use config::BenchConfig;
pub use dataset::{email_suffix, generate_users, run_tag, SyntheticUser};
pub use driver::BenchmarkDriver;
pub use error::{BenchError, BenchPhase, BenchResult};
pub use report::{BenchmarkReport, CleanupSummary, RunSummary};
pub use stats::{safe_ratio, Comparison, Sample, TierReport, TimedLoop};
