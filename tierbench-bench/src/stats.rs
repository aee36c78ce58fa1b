//! Timing samples and summary statistics.

use std::time::Duration;

use serde::Serialize;
use tierbench_core::{RecordId, Tier};

/// One timed adapter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub tier: Tier,
    pub record_id: RecordId,
    pub elapsed: Duration,
}

/// Output of one timed access loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedLoop {
    pub tier: Tier,
    pub samples: Vec<Sample>,
    /// Wall-clock time of the whole loop, including selection and assertion overhead.
    pub wall_clock: Duration,
}

impl TimedLoop {
    pub fn durations_ms(&self) -> Vec<f64> {
        self.samples.iter().map(|s| duration_ms(s.elapsed)).collect()
    }
}

/// Summary statistics for one tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierReport {
    pub tier: Tier,
    pub backend: String,
    pub operation_count: usize,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// Sum of per-operation durations.
    pub total_ms: f64,
    /// Wall-clock duration of the loop; `ops_per_second` derives from this.
    pub wall_clock_ms: f64,
    pub ops_per_second: f64,
    pub variance_ms2: f64,
    pub std_dev_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub raw_samples: Vec<f64>,
}

impl TierReport {
    /// Aggregate a finished loop. An empty loop yields all-zero statistics.
    pub fn from_loop(timed: &TimedLoop) -> Self {
        let raw = timed.durations_ms();
        let count = raw.len();
        let wall_clock_ms = duration_ms(timed.wall_clock);

        let (min_ms, max_ms) = if raw.is_empty() {
            (0.0, 0.0)
        } else {
            raw.iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                })
        };
        let total_ms: f64 = raw.iter().sum();
        let mean_ms = if count == 0 {
            0.0
        } else {
            (total_ms / count as f64).clamp(min_ms, max_ms)
        };
        let variance_ms2 = variance(&raw, mean_ms);

        let mut sorted = raw.clone();
        sorted.sort_by(f64::total_cmp);

        Self {
            tier: timed.tier,
            backend: timed.tier.backend_name().to_string(),
            operation_count: count,
            mean_ms,
            min_ms,
            max_ms,
            total_ms,
            wall_clock_ms,
            ops_per_second: safe_ratio(count as f64, wall_clock_ms / 1_000.0),
            variance_ms2,
            std_dev_ms: variance_ms2.sqrt(),
            p50_ms: percentile(&sorted, 50.0),
            p95_ms: percentile(&sorted, 95.0),
            p99_ms: percentile(&sorted, 99.0),
            raw_samples: raw,
        }
    }
}

/// Derived cache-versus-durable comparison metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// Mean durable time divided by mean cache time.
    pub speed_factor: f64,
    pub time_saved_per_op_ms: f64,
    pub total_time_saved_ms: f64,
    /// Cache throughput divided by durable throughput.
    pub throughput_ratio: f64,
}

impl Comparison {
    pub fn between(durable: &TierReport, cache: &TierReport) -> Self {
        Self {
            speed_factor: safe_ratio(durable.mean_ms, cache.mean_ms),
            time_saved_per_op_ms: durable.mean_ms - cache.mean_ms,
            total_time_saved_ms: durable.total_ms - cache.total_ms,
            throughput_ratio: safe_ratio(cache.ops_per_second, durable.ops_per_second),
        }
    }
}

/// Divide without panicking or producing NaN.
///
/// A zero denominator yields `f64::INFINITY`, except `0 / 0` which is `1.0`
/// (two tiers that both measure zero are equally fast).
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else if numerator == 0.0 {
        1.0
    } else {
        f64::INFINITY
    }
}

/// Population variance around `mean`.
pub fn variance(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

/// Nearest-rank percentile over an ascending slice.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

pub(crate) fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000.0
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_mean_between_min_and_max(
            micros in prop::collection::vec(0u64..5_000_000, 1..200),
            wall_ms in 0u64..100_000,
        ) {
            let timed = TimedLoop {
                tier: Tier::Durable,
                samples: micros.iter().map(|us| Sample {
                    tier: Tier::Durable,
                    record_id: 1,
                    elapsed: Duration::from_micros(*us),
                }).collect(),
                wall_clock: Duration::from_millis(wall_ms),
            };
            let report = TierReport::from_loop(&timed);

            prop_assert!(report.min_ms <= report.mean_ms);
            prop_assert!(report.mean_ms <= report.max_ms);
            prop_assert!(report.p50_ms <= report.p95_ms);
            prop_assert!(report.p95_ms <= report.p99_ms);
            prop_assert!(report.variance_ms2 >= 0.0);
            prop_assert!(!report.ops_per_second.is_nan());
        }

        #[test]
        fn prop_safe_ratio_never_nan(num in 0.0f64..1e9, den in 0.0f64..1e9) {
            prop_assert!(!safe_ratio(num, den).is_nan());
        }
    }
}
