//! Benchmark driver tests over the in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tierbench_bench::{generate_users, BenchConfig, BenchError, BenchPhase, BenchmarkDriver};
use tierbench_test_utils::fixtures::*;
use tierbench_test_utils::*;

fn small_config() -> BenchConfig {
    BenchConfig::new()
        .with_records(100)
        .with_reads(100)
        .with_warm_records(40)
        .with_batch_size(10)
        .with_seed(42)
        .with_phase_timeout(Duration::from_secs(30))
}

#[tokio::test]
async fn test_full_run_produces_consistent_report() {
    let fixture = memory_fixture();
    let driver = BenchmarkDriver::new(fixture.layer.clone(), small_config()).unwrap();

    let report = driver.run().await.unwrap();

    assert_eq!(report.run.records, 100);
    assert_eq!(report.run.warmed_records, 40);
    assert_eq!(report.run.seed, 42);
    for tier in [&report.durable, &report.cache] {
        assert_eq!(tier.operation_count, 100);
        assert_eq!(tier.raw_samples.len(), 100);
        assert!(tier.min_ms <= tier.mean_ms && tier.mean_ms <= tier.max_ms);
        assert!(tier.ops_per_second > 0.0);
        assert!(tier.ops_per_second.is_finite());
        assert!(tier.variance_ms2 >= 0.0);
    }
    assert_eq!(report.durable.tier, Tier::Durable);
    assert_eq!(report.cache.tier, Tier::Cache);
    assert!(report.comparison.speed_factor > 0.0);
    assert!(report.comparison.speed_factor.is_finite());
    assert!(report.comparison.throughput_ratio > 0.0);

    assert!(report.cleanup.is_clean());
    assert_eq!(report.cleanup.deleted, 100);
    assert!(fixture.durable.is_empty());
    assert!(fixture.cache.is_empty());
}

#[tokio::test]
async fn test_population_never_exceeds_batch_size() {
    let fixture = memory_fixture();
    let config = small_config().with_records(50).with_warm_records(5).with_batch_size(7);
    let driver = BenchmarkDriver::new(fixture.layer.clone(), config).unwrap();

    let mut created = Vec::new();
    driver
        .populate(&generate_users(50, 1), &mut created)
        .await
        .unwrap();

    assert_eq!(created.len(), 50);
    assert_eq!(fixture.durable.max_in_flight(), 7);
}

#[tokio::test]
async fn test_populated_records_are_served_from_cache() {
    let fixture = memory_fixture();
    let driver = BenchmarkDriver::new(fixture.layer.clone(), small_config()).unwrap();

    let mut created = Vec::new();
    driver
        .populate(&generate_users(20, 5), &mut created)
        .await
        .unwrap();
    for id in &created {
        assert!(fixture.layer.get_by_id(*id).await.unwrap().is_some());
    }

    assert_eq!(fixture.layer.stats().hit_rate(), 1.0);
    assert_eq!(fixture.durable.op_counts().point_reads, 0);
}

#[tokio::test]
async fn test_same_seed_same_access_pattern() {
    let fixture = memory_fixture();
    let ids: Vec<RecordId> = seed_records(&fixture.layer, 20)
        .await
        .iter()
        .map(|r| r.id)
        .collect();
    let driver = BenchmarkDriver::new(fixture.layer.clone(), small_config().with_reads(30)).unwrap();

    let a = driver
        .time_durable_reads(&ids, &mut StdRng::seed_from_u64(7))
        .await
        .unwrap();
    let b = driver
        .time_durable_reads(&ids, &mut StdRng::seed_from_u64(7))
        .await
        .unwrap();

    let pattern = |l: &tierbench_bench::TimedLoop| l.samples.iter().map(|s| s.record_id).collect::<Vec<_>>();
    assert_eq!(pattern(&a), pattern(&b));
}

#[tokio::test]
async fn test_cache_loop_reads_only_warmed_ids() {
    let fixture = memory_fixture();
    let ids: Vec<RecordId> = seed_records(&fixture.layer, 50)
        .await
        .iter()
        .map(|r| r.id)
        .collect();
    let config = small_config().with_records(50).with_warm_records(10);
    let driver = BenchmarkDriver::new(fixture.layer.clone(), config).unwrap();
    let mut rng = StdRng::seed_from_u64(3);

    let warmed = driver.warm_cache(&ids, &mut rng).await.unwrap();
    assert_eq!(warmed.len(), 10);

    let timed = driver.time_cache_reads(&warmed, &mut rng).await.unwrap();
    assert_eq!(timed.samples.len(), 100);
    assert!(timed.samples.iter().all(|s| warmed.contains(&s.record_id)));
}

#[tokio::test]
async fn test_missing_row_fails_durable_loop() {
    let fixture = memory_fixture();
    let driver = BenchmarkDriver::new(fixture.layer.clone(), small_config()).unwrap();

    let err = driver
        .time_durable_reads(&[9_999], &mut StdRng::seed_from_u64(1))
        .await
        .unwrap_err();

    assert!(err.is_assertion());
    assert_eq!(err.phase(), Some(BenchPhase::DurableReads));
}

#[tokio::test]
async fn test_unavailable_durable_store_aborts_population() {
    let fixture = memory_fixture();
    fixture.durable.set_unavailable(true);
    let driver = BenchmarkDriver::new(fixture.layer.clone(), small_config()).unwrap();

    let err = driver.run().await.unwrap_err();

    assert_eq!(err.phase(), Some(BenchPhase::Populate));
    assert!(matches!(err, BenchError::Adapter { .. }));
}

#[tokio::test]
async fn test_warm_up_failure_still_cleans_up() {
    let durable = Arc::new(InMemoryDurableStore::new());
    let cache = Arc::new(FaultyCache::new());
    // Population writes one per-record key per create; warm-up writes fail.
    cache.fail_sets_after(100);
    let layer = RecordAccessLayer::with_defaults(durable.clone(), cache.clone());
    let driver = BenchmarkDriver::new(layer, small_config()).unwrap();

    let err = driver.run().await.unwrap_err();

    assert_eq!(err.phase(), Some(BenchPhase::WarmCache));
    assert!(durable.is_empty());
    assert!(cache.inner().is_empty());
}

#[tokio::test]
async fn test_failed_population_removes_rows_with_lost_ids() {
    let durable = Arc::new(InMemoryDurableStore::new());
    let cache = Arc::new(FaultyCache::new());
    // Half of the first batch commits its row but fails the cache write.
    cache.fail_sets_after(5);
    let layer = RecordAccessLayer::with_defaults(durable.clone(), cache.clone());
    let config = small_config().with_records(20).with_warm_records(5);
    let driver = BenchmarkDriver::new(layer, config).unwrap();

    let err = driver.run().await.unwrap_err();

    assert_eq!(err.phase(), Some(BenchPhase::Populate));
    assert_eq!(durable.op_counts().inserts, 10);
    assert!(durable.is_empty(), "{} rows left behind", durable.len());
}

#[tokio::test]
async fn test_sweep_leaves_other_runs_untouched() {
    let fixture = memory_fixture();
    let foreign = fixture
        .layer
        .create("Other", "user0_1@benchmark.test")
        .await
        .unwrap();
    let mut created = Vec::new();
    let driver = BenchmarkDriver::new(fixture.layer.clone(), small_config()).unwrap();
    driver
        .populate(&generate_users(4, 77), &mut created)
        .await
        .unwrap();

    // Only the first two ids are known; the rest must be found by tag.
    let summary = driver.cleanup(&created[..2], Some(77)).await;

    assert_eq!(summary.deleted, 4);
    assert!(summary.is_clean());
    let remaining = fixture.durable.find_all().await.unwrap();
    assert_eq!(remaining, vec![foreign]);
}

#[tokio::test]
async fn test_cleanup_counts_deletes_while_cache_is_down() {
    let fixture = memory_fixture();
    let ids: Vec<RecordId> = seed_records(&fixture.layer, 10)
        .await
        .iter()
        .map(|r| r.id)
        .collect();
    fixture.cache.set_unavailable(true);
    let driver = BenchmarkDriver::new(fixture.layer.clone(), small_config()).unwrap();

    let summary = driver.cleanup(&ids, None).await;

    assert_eq!(summary.deleted, 10);
    assert_eq!(summary.failed, 0);
    assert!(!summary.cache_flushed);
    assert!(fixture.durable.is_empty());
}

#[tokio::test]
async fn test_corrupted_cache_value_fails_cache_loop() {
    let durable = Arc::new(InMemoryDurableStore::new());
    let cache = Arc::new(FaultyCache::new());
    cache.corrupt_reads(true);
    let layer = RecordAccessLayer::with_defaults(durable.clone(), cache.clone());
    let driver = BenchmarkDriver::new(layer, small_config()).unwrap();

    let err = driver.run().await.unwrap_err();

    assert!(err.is_assertion());
    assert_eq!(err.phase(), Some(BenchPhase::CacheReads));
    assert!(durable.is_empty());
}

#[tokio::test]
async fn test_slow_population_times_out() {
    let durable = Arc::new(InMemoryDurableStore::new().with_latency(Duration::from_millis(200)));
    let cache = Arc::new(InMemoryCache::new());
    let layer = RecordAccessLayer::with_defaults(durable.clone(), cache);
    let config = small_config()
        .with_records(5)
        .with_warm_records(5)
        .with_phase_timeout(Duration::from_millis(20));
    let driver = BenchmarkDriver::new(layer, config).unwrap();

    let err = driver.run().await.unwrap_err();

    assert!(matches!(
        err,
        BenchError::Timeout {
            phase: BenchPhase::Populate,
            ..
        }
    ));
    assert!(durable.is_empty());
}

#[test]
fn test_invalid_config_is_rejected() {
    let fixture = memory_fixture();
    let result = BenchmarkDriver::new(fixture.layer.clone(), small_config().with_batch_size(0));
    assert!(matches!(result, Err(BenchError::InvalidConfig { .. })));
}

mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(30))]

        #[test]
        fn prop_in_flight_creates_bounded_by_batch_size(
            records in 1usize..80,
            batch_size in 1usize..20,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            rt.block_on(async {
                let fixture = memory_fixture();
                let config = BenchConfig::new()
                    .with_records(records)
                    .with_warm_records(1)
                    .with_batch_size(batch_size);
                let driver = BenchmarkDriver::new(fixture.layer.clone(), config).unwrap();

                let mut created = Vec::new();
                driver
                    .populate(&generate_users(records, 0), &mut created)
                    .await
                    .unwrap();

                prop_assert_eq!(created.len(), records);
                prop_assert!(fixture.durable.max_in_flight() <= batch_size);
                Ok(())
            })?;
        }
    }
}
