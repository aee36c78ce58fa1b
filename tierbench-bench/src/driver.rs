//! Benchmark driver.
//!
//! Runs the phases in order: population through the access layer, cache
//! warm-up, one timed read loop per tier issued directly against the adapters,
//! aggregation, and best-effort cleanup. Every phase is bounded by the
//! configured phase timeout. Population and warm-up run in bounded batches;
//! the timed loops are strictly sequential.

use std::collections::HashSet;
use std::future::Future;
use std::ops::ControlFlow;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use tierbench_core::{decode_record, encode_record, record_key, RecordId, Tier, TierResult};
use tierbench_storage::{CacheStore, DurableStore, RecordAccessLayer};
use tracing::{debug, error, info, warn};

use crate::batch::BatchExecutor;
use crate::config::BenchConfig;
use crate::dataset::{email_suffix, generate_users, run_tag, SyntheticUser};
use crate::error::{BenchError, BenchPhase, BenchResult};
use crate::report::{BenchmarkReport, CleanupSummary, RunSummary};
use crate::stats::{duration_ms, Sample, TierReport, TimedLoop};

/// Cap on individual cleanup errors kept in the report.
const MAX_REPORTED_CLEANUP_ERRORS: usize = 20;

struct Measurement {
    warmed: usize,
    warm_ms: f64,
    durable: TimedLoop,
    cache: TimedLoop,
}

/// Drives one benchmark run over an access layer and its two adapters.
pub struct BenchmarkDriver<D: ?Sized, C: ?Sized> {
    layer: RecordAccessLayer<D, C>,
    config: BenchConfig,
    executor: BatchExecutor,
}

impl<D, C> BenchmarkDriver<D, C>
where
    D: DurableStore + ?Sized,
    C: CacheStore + ?Sized,
{
    /// Create a driver, rejecting an invalid configuration up front.
    pub fn new(layer: RecordAccessLayer<D, C>, config: BenchConfig) -> BenchResult<Self> {
        config.validate()?;
        let executor = BatchExecutor::new(config.batch_size);
        Ok(Self {
            layer,
            config,
            executor,
        })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn layer(&self) -> &RecordAccessLayer<D, C> {
        &self.layer
    }

    /// Run every phase and produce a report.
    ///
    /// Cleanup runs whether or not the earlier phases succeeded; its own
    /// failures are recorded in the report (or logged, when the run already
    /// failed) and never replace the primary outcome. Consumes the driver so
    /// the adapter handles are released when the run ends.
    pub async fn run(self) -> BenchResult<BenchmarkReport> {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        info!(
            records = self.config.records,
            reads = self.config.reads,
            warm_records = self.config.warm_records,
            batch_size = self.config.batch_size,
            seed,
            "Starting benchmark"
        );

        let tag = run_tag();
        let users = generate_users(self.config.records, tag);
        let mut created = Vec::with_capacity(users.len());

        let started = Instant::now();
        let populated = self
            .bounded(BenchPhase::Populate, self.populate(&users, &mut created))
            .await;
        let populate_ms = duration_ms(started.elapsed());

        // A create can commit its row and still fail (or be cut off by the
        // timeout) before its id reaches `created`.
        let (outcome, sweep_tag) = match populated {
            Ok(()) => (self.measure(&created, &mut rng).await, None),
            Err(e) => (Err(e), Some(tag)),
        };

        let cleanup = self.cleanup(&created, sweep_tag).await;
        let batch_size = self.config.batch_size;
        drop(self);
        debug!("Adapter handles released");

        match outcome {
            Ok(m) => {
                let run = RunSummary {
                    records: created.len(),
                    reads: m.durable.samples.len(),
                    warmed_records: m.warmed,
                    batch_size,
                    seed,
                    populate_ms,
                    warm_ms: m.warm_ms,
                };
                Ok(BenchmarkReport::new(
                    run,
                    TierReport::from_loop(&m.durable),
                    TierReport::from_loop(&m.cache),
                    cleanup,
                ))
            }
            Err(e) => {
                error!(phase = ?e.phase(), error = %e, "Benchmark aborted");
                if !cleanup.is_clean() {
                    warn!(
                        deleted = cleanup.deleted,
                        failed = cleanup.failed,
                        cache_flushed = cleanup.cache_flushed,
                        "Cleanup after aborted run was incomplete"
                    );
                }
                Err(e)
            }
        }
    }

    async fn bounded<T, F>(&self, phase: BenchPhase, fut: F) -> BenchResult<T>
    where
        F: Future<Output = BenchResult<T>>,
    {
        let limit = self.config.phase_timeout;
        tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| BenchError::Timeout { phase, limit })?
    }

    async fn measure(&self, ids: &[RecordId], rng: &mut StdRng) -> BenchResult<Measurement> {
        let started = Instant::now();
        let warmed = self
            .bounded(BenchPhase::WarmCache, self.warm_cache(ids, rng))
            .await?;
        let warm_ms = duration_ms(started.elapsed());

        let durable = self
            .bounded(BenchPhase::DurableReads, self.time_durable_reads(ids, rng))
            .await?;
        let cache = self
            .bounded(BenchPhase::CacheReads, self.time_cache_reads(&warmed, rng))
            .await?;

        Ok(Measurement {
            warmed: warmed.len(),
            warm_ms,
            durable,
            cache,
        })
    }

    /// Create every user through the access layer in bounded batches.
    ///
    /// Ids are appended to `created` as each batch clears its barrier, so a
    /// failed or timed-out population still leaves every assigned id
    /// available for cleanup. The first failing batch stops the phase.
    pub async fn populate(
        &self,
        users: &[SyntheticUser],
        created: &mut Vec<RecordId>,
    ) -> BenchResult<()> {
        let started = Instant::now();
        let mut failure = None;

        self.executor
            .run(
                users,
                |user| self.layer.create(&user.name, &user.email),
                |batch| {
                    for result in batch {
                        match result {
                            Ok(record) => created.push(record.id),
                            Err(e) => {
                                failure.get_or_insert(e);
                            }
                        }
                    }
                    if failure.is_some() {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                },
            )
            .await;

        if let Some(e) = failure {
            return Err(BenchError::adapter(BenchPhase::Populate, e));
        }

        info!(
            records = created.len(),
            elapsed_ms = duration_ms(started.elapsed()),
            "Population complete"
        );
        Ok(())
    }

    /// Copy a random subset of `ids` from the durable store into the cache.
    ///
    /// Returns the warmed ids; the cache read loop samples only from these.
    pub async fn warm_cache(&self, ids: &[RecordId], rng: &mut StdRng) -> BenchResult<Vec<RecordId>> {
        let phase = BenchPhase::WarmCache;
        let amount = self.config.warm_records.min(ids.len());
        let subset: Vec<RecordId> = index::sample(rng, ids.len(), amount)
            .into_iter()
            .map(|i| ids[i])
            .collect();

        let durable = self.layer.durable();
        let cache = self.layer.cache();
        let ttl = self.layer.config().ttl_seconds();

        let mut warmed = Vec::with_capacity(subset.len());
        let mut failure = None;

        self.executor
            .run(
                &subset,
                |id| {
                    let id = *id;
                    async move {
                        let record = durable
                            .find_by_id(id)
                            .await
                            .map_err(|e| BenchError::adapter(phase, e))?
                            .ok_or_else(|| {
                                BenchError::assertion(phase, format!("record {} missing before warm-up", id))
                            })?;
                        let value = encode_record(&record).map_err(|e| BenchError::adapter(phase, e))?;
                        cache
                            .set_with_expiry(&record_key(id), &value, ttl)
                            .await
                            .map_err(|e| BenchError::adapter(phase, e))?;
                        Ok::<_, BenchError>(id)
                    }
                },
                |batch| {
                    for result in batch {
                        match result {
                            Ok(id) => warmed.push(id),
                            Err(e) => {
                                failure.get_or_insert(e);
                            }
                        }
                    }
                    if failure.is_some() {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                },
            )
            .await;

        if let Some(e) = failure {
            return Err(e);
        }

        info!(warmed = warmed.len(), "Cache warm-up complete");
        Ok(warmed)
    }

    /// Issue `reads` sequential point reads against the durable store.
    ///
    /// Only the adapter call is timed. Any error or a row that does not
    /// match the requested id aborts the loop.
    pub async fn time_durable_reads(&self, ids: &[RecordId], rng: &mut StdRng) -> BenchResult<TimedLoop> {
        let phase = BenchPhase::DurableReads;
        if ids.is_empty() {
            return Err(BenchError::assertion(phase, "no records to read"));
        }

        let durable = self.layer.durable();
        let mut samples = Vec::with_capacity(self.config.reads);
        let loop_started = Instant::now();

        for _ in 0..self.config.reads {
            let id = ids[rng.random_range(0..ids.len())];

            let started = Instant::now();
            let row = durable.find_by_id(id).await;
            let elapsed = started.elapsed();

            match row.map_err(|e| BenchError::adapter(phase, e))? {
                Some(record) if record.id == id => {}
                Some(record) => {
                    return Err(BenchError::assertion(
                        phase,
                        format!("requested record {} but read {}", id, record.id),
                    ))
                }
                None => return Err(BenchError::assertion(phase, format!("record {} not found", id))),
            }

            samples.push(Sample {
                tier: Tier::Durable,
                record_id: id,
                elapsed,
            });
        }

        let timed = TimedLoop {
            tier: Tier::Durable,
            samples,
            wall_clock: loop_started.elapsed(),
        };
        info!(
            reads = timed.samples.len(),
            wall_clock_ms = duration_ms(timed.wall_clock),
            "Durable read loop complete"
        );
        Ok(timed)
    }

    /// Issue `reads` sequential gets against the cache for warmed ids.
    ///
    /// A missing value, an undecodable value, or a value whose id differs
    /// from the requested key aborts the loop.
    pub async fn time_cache_reads(&self, warmed: &[RecordId], rng: &mut StdRng) -> BenchResult<TimedLoop> {
        let phase = BenchPhase::CacheReads;
        if warmed.is_empty() {
            return Err(BenchError::assertion(phase, "no warmed records to read"));
        }

        let cache = self.layer.cache();
        let mut samples = Vec::with_capacity(self.config.reads);
        let loop_started = Instant::now();

        for _ in 0..self.config.reads {
            let id = warmed[rng.random_range(0..warmed.len())];
            let key = record_key(id);

            let started = Instant::now();
            let value = cache.get(&key).await;
            let elapsed = started.elapsed();

            let raw = value
                .map_err(|e| BenchError::adapter(phase, e))?
                .ok_or_else(|| BenchError::assertion(phase, format!("cache miss for {}", key)))?;
            let record = decode_record(&key, &raw)
                .map_err(|e| BenchError::assertion(phase, e.to_string()))?;
            if record.id != id {
                return Err(BenchError::assertion(
                    phase,
                    format!("key {} holds record {}", key, record.id),
                ));
            }

            samples.push(Sample {
                tier: Tier::Cache,
                record_id: id,
                elapsed,
            });
        }

        let timed = TimedLoop {
            tier: Tier::Cache,
            samples,
            wall_clock: loop_started.elapsed(),
        };
        info!(
            reads = timed.samples.len(),
            wall_clock_ms = duration_ms(timed.wall_clock),
            "Cache read loop complete"
        );
        Ok(timed)
    }

    /// Delete every created record in bounded batches, then flush the cache.
    ///
    /// With `sweep_tag` set, rows carrying that run's email suffix are
    /// deleted too, even when their ids were never recorded. Rows are deleted
    /// straight from the durable store; the final flush clears their keys.
    /// Never fails: errors are logged and collected into the summary.
    pub async fn cleanup(&self, ids: &[RecordId], sweep_tag: Option<i64>) -> CleanupSummary {
        let limit = self.config.phase_timeout;
        let mut summary = CleanupSummary::default();
        let mut targets = ids.to_vec();

        if let Some(tag) = sweep_tag {
            match tokio::time::timeout(limit, self.unrecorded_rows(tag, ids)).await {
                Ok(Ok(orphans)) => {
                    if !orphans.is_empty() {
                        warn!(count = orphans.len(), "Deleting rows whose ids were lost during population");
                    }
                    targets.extend(orphans);
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "Could not scan for unrecorded rows");
                    summary.errors.push(format!("unrecorded row scan failed: {}", e));
                }
                Err(_) => {
                    warn!(?limit, "Unrecorded row scan timed out");
                    summary
                        .errors
                        .push(format!("unrecorded row scan timed out after {:?}", limit));
                }
            }
        }

        let durable = self.layer.durable();
        let deleting = self.executor.run(
            &targets,
            |id| durable.delete_by_id(*id),
            |batch| {
                for result in batch {
                    match result {
                        Ok(0) => {}
                        Ok(_) => summary.deleted += 1,
                        Err(e) => {
                            summary.failed += 1;
                            if summary.errors.len() < MAX_REPORTED_CLEANUP_ERRORS {
                                summary.errors.push(e.to_string());
                            }
                        }
                    }
                }
                ControlFlow::Continue(())
            },
        );
        if tokio::time::timeout(limit, deleting).await.is_err() {
            warn!(?limit, "Cleanup deletes timed out");
            summary
                .errors
                .push(format!("{} timed out after {:?}", BenchPhase::Cleanup, limit));
        }
        if summary.failed > 0 {
            warn!(failed = summary.failed, "Some records could not be deleted");
        }

        match tokio::time::timeout(limit, self.layer.cache().flush_all()).await {
            Ok(Ok(())) => summary.cache_flushed = true,
            Ok(Err(e)) => {
                warn!(error = %e, "Cache flush failed");
                summary.errors.push(format!("cache flush failed: {}", e));
            }
            Err(_) => {
                warn!(?limit, "Cache flush timed out");
                summary.errors.push(format!("cache flush timed out after {:?}", limit));
            }
        }

        info!(
            deleted = summary.deleted,
            failed = summary.failed,
            cache_flushed = summary.cache_flushed,
            "Cleanup complete"
        );
        summary
    }

    /// Ids of this run's rows (by email suffix) that are missing from `known`.
    async fn unrecorded_rows(&self, tag: i64, known: &[RecordId]) -> TierResult<Vec<RecordId>> {
        let suffix = email_suffix(tag);
        let known: HashSet<RecordId> = known.iter().copied().collect();
        let rows = self.layer.durable().find_all().await?;
        Ok(rows
            .into_iter()
            .filter(|r| r.email.ends_with(&suffix) && !known.contains(&r.id))
            .map(|r| r.id)
            .collect())
    }
}
