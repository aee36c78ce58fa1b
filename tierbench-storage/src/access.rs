//! Cache-aside record access layer.
//!
//! Reads check the cache first and fall back to the durable store, writing
//! what they found back into the cache. Writes go to the durable store first
//! and then update or evict the affected cache keys.
//!
//! # Invalidation Contract
//!
//! No write path leaves the aggregate `users:all` entry holding pre-write
//! data: every successful create and delete evicts it, and only
//! [`RecordAccessLayer::get_all`] repopulates it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tierbench_core::{
    decode_record, decode_records, encode_record, encode_records, record_key, AccessConfig,
    Record, RecordId, TierResult, ALL_RECORDS_KEY,
};
use tracing::{debug, warn};

use crate::traits::{CacheStore, DurableStore};

/// Hit/miss counters for reads served through the access layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessStats {
    /// Reads answered from the cache.
    pub hits: u64,
    /// Reads that fell through to the durable store.
    pub misses: u64,
}

impl AccessStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct StatCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Two-tier record store with cache-aside reads and invalidating writes.
///
/// Adapter errors propagate to the caller unchanged; this layer never
/// retries. Both adapters are injected and shared, so cloning the layer is
/// cheap.
///
/// # Example
///
/// ```ignore
/// let layer = RecordAccessLayer::new(durable, cache, AccessConfig::default());
///
/// let created = layer.create("Ada", "ada@test.com").await?;
/// // Served from the cache populated by `create`.
/// let read = layer.get_by_id(created.id).await?;
/// ```
pub struct RecordAccessLayer<D: ?Sized, C: ?Sized> {
    durable: Arc<D>,
    cache: Arc<C>,
    config: AccessConfig,
    stats: Arc<StatCounters>,
}

impl<D, C> RecordAccessLayer<D, C>
where
    D: DurableStore + ?Sized,
    C: CacheStore + ?Sized,
{
    /// Create a new access layer over the given adapters.
    pub fn new(durable: Arc<D>, cache: Arc<C>, config: AccessConfig) -> Self {
        Self {
            durable,
            cache,
            config,
            stats: Arc::new(StatCounters::default()),
        }
    }

    /// Create a new access layer with default configuration.
    pub fn with_defaults(durable: Arc<D>, cache: Arc<C>) -> Self {
        Self::new(durable, cache, AccessConfig::default())
    }

    /// Get the access configuration.
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Get the durable store adapter.
    pub fn durable(&self) -> &Arc<D> {
        &self.durable
    }

    /// Get the cache adapter.
    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    /// Hit/miss counters for `get_by_id` and `get_all`.
    pub fn stats(&self) -> AccessStats {
        AccessStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
        }
    }

    /// Insert a record, cache it under its own key, and evict the aggregate.
    ///
    /// Returns the durable store's row, including the assigned id and
    /// creation timestamp. A duplicate email fails with `DuplicateKey` and
    /// leaves the cache untouched.
    pub async fn create(&self, name: &str, email: &str) -> TierResult<Record> {
        let record = self.durable.insert(name, email).await?;

        self.cache.delete(ALL_RECORDS_KEY).await?;
        let value = encode_record(&record)?;
        self.cache
            .set_with_expiry(&record_key(record.id), &value, self.config.ttl_seconds())
            .await?;

        debug!(id = record.id, "record created and cached");
        Ok(record)
    }

    /// Read one record, cache first.
    ///
    /// On a miss the durable row is written back under the per-record key.
    /// `Ok(None)` means the record exists in neither tier.
    pub async fn get_by_id(&self, id: RecordId) -> TierResult<Option<Record>> {
        let key = record_key(id);

        if let Some(raw) = self.cache.get(&key).await? {
            match decode_record(&key, &raw) {
                Ok(record) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(id, "cache hit");
                    return Ok(Some(record));
                }
                // Unreadable entry, treat as a miss and overwrite it below
                Err(e) => warn!(id, error = %e, "discarding undecodable cache entry"),
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        debug!(id, "cache miss");

        let Some(record) = self.durable.find_by_id(id).await? else {
            return Ok(None);
        };

        let value = encode_record(&record)?;
        self.cache
            .set_with_expiry(&key, &value, self.config.ttl_seconds())
            .await?;
        Ok(Some(record))
    }

    /// Read every record, using the aggregate cache entry when present.
    pub async fn get_all(&self) -> TierResult<Vec<Record>> {
        if let Some(raw) = self.cache.get(ALL_RECORDS_KEY).await? {
            match decode_records(&raw) {
                Ok(records) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(count = records.len(), "aggregate cache hit");
                    return Ok(records);
                }
                Err(e) => warn!(error = %e, "discarding undecodable aggregate entry"),
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        let records = self.durable.find_all().await?;

        let value = encode_records(&records)?;
        self.cache
            .set_with_expiry(ALL_RECORDS_KEY, &value, self.config.ttl_seconds())
            .await?;

        debug!(count = records.len(), "aggregate cache repopulated");
        Ok(records)
    }

    /// Delete a record and evict both its key and the aggregate key.
    ///
    /// Returns `false`, without touching the cache, when no row existed.
    pub async fn delete(&self, id: RecordId) -> TierResult<bool> {
        let affected = self.durable.delete_by_id(id).await?;
        if affected == 0 {
            return Ok(false);
        }

        self.cache.delete(&record_key(id)).await?;
        self.cache.delete(ALL_RECORDS_KEY).await?;

        debug!(id, "record deleted and evicted");
        Ok(true)
    }
}

impl<D: ?Sized, C: ?Sized> Clone for RecordAccessLayer<D, C> {
    fn clone(&self) -> Self {
        Self {
            durable: Arc::clone(&self.durable),
            cache: Arc::clone(&self.cache),
            config: self.config.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
