//! Benchmark report: structured data plus a human-readable table.

use std::fmt;

use serde::Serialize;

use crate::stats::{Comparison, TierReport};

/// Parameters and setup timings of the run that produced a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub records: usize,
    pub reads: usize,
    pub warmed_records: usize,
    pub batch_size: usize,
    pub seed: u64,
    pub populate_ms: f64,
    pub warm_ms: f64,
}

/// Outcome of the best-effort cleanup phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    pub deleted: usize,
    pub failed: usize,
    pub cache_flushed: bool,
    pub errors: Vec<String>,
}

impl CleanupSummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.cache_flushed && self.errors.is_empty()
    }
}

/// Final output of a completed benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub run: RunSummary,
    pub durable: TierReport,
    pub cache: TierReport,
    pub comparison: Comparison,
    pub cleanup: CleanupSummary,
}

impl BenchmarkReport {
    pub fn new(
        run: RunSummary,
        durable: TierReport,
        cache: TierReport,
        cleanup: CleanupSummary,
    ) -> Self {
        let comparison = Comparison::between(&durable, &cache);
        Self {
            run,
            durable,
            cache,
            comparison,
            cleanup,
        }
    }

    /// Serialize to pretty JSON. Infinite ratios become `null`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn write_tier(f: &mut fmt::Formatter<'_>, t: &TierReport) -> fmt::Result {
    writeln!(
        f,
        "  {:<12} {:>8} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>12.1}",
        t.backend, t.operation_count, t.mean_ms, t.min_ms, t.max_ms, t.p95_ms, t.std_dev_ms, t.ops_per_second
    )
}

fn ratio(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}x", value)
    } else {
        "inf".to_string()
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(88);
        writeln!(f, "{}", rule)?;
        writeln!(f, "  PostgreSQL vs Redis Read Benchmark")?;
        writeln!(
            f,
            "  {} records, {} reads per tier, {} warmed, batch size {}, seed {}",
            self.run.records, self.run.reads, self.run.warmed_records, self.run.batch_size, self.run.seed
        )?;
        writeln!(
            f,
            "  Setup: population {:.1}ms, warm-up {:.1}ms",
            self.run.populate_ms, self.run.warm_ms
        )?;
        writeln!(f, "{}", rule)?;
        writeln!(
            f,
            "  {:<12} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10} {:>12}",
            "Backend", "Ops", "Mean ms", "Min ms", "Max ms", "p95 ms", "Stddev", "Ops/sec"
        )?;
        writeln!(f, "  {}", "-".repeat(86))?;
        write_tier(f, &self.durable)?;
        write_tier(f, &self.cache)?;
        writeln!(f, "  {}", "-".repeat(86))?;
        writeln!(
            f,
            "  Sum of op time: {:.1}ms (PostgreSQL) / {:.1}ms (Redis); wall clock: {:.1}ms / {:.1}ms",
            self.durable.total_ms, self.cache.total_ms, self.durable.wall_clock_ms, self.cache.wall_clock_ms
        )?;
        writeln!(f, "  Speed factor:      {}", ratio(self.comparison.speed_factor))?;
        writeln!(f, "  Throughput ratio:  {}", ratio(self.comparison.throughput_ratio))?;
        writeln!(
            f,
            "  Time saved:        {:.3}ms per op, {:.1}ms total",
            self.comparison.time_saved_per_op_ms, self.comparison.total_time_saved_ms
        )?;
        if self.cleanup.is_clean() {
            writeln!(f, "  Cleanup:           {} records deleted, cache flushed", self.cleanup.deleted)?;
        } else {
            writeln!(
                f,
                "  Cleanup:           {} deleted, {} failed, cache flushed: {}",
                self.cleanup.deleted, self.cleanup.failed, self.cleanup.cache_flushed
            )?;
            for err in &self.cleanup.errors {
                writeln!(f, "    - {}", err)?;
            }
        }
        write!(f, "{}", rule)
    }
}
