//! In-memory tier adapters.
//!
//! `InMemoryDurableStore` and `InMemoryCache` implement the adapter traits
//! without any external service. Both count every operation they serve so
//! tests can assert which tier was touched, and both can be switched into an
//! unavailable state to exercise error propagation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tierbench_core::{Record, RecordId, Tier, TierError, TierResult};

use crate::traits::{CacheStore, DurableStore};

// ============================================================================
// DURABLE STORE
// ============================================================================

#[derive(Debug)]
struct TableState {
    rows: BTreeMap<RecordId, Record>,
    emails: HashSet<String>,
    next_id: RecordId,
}

/// Decrements the in-flight counter when an insert finishes or is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for TableState {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            emails: HashSet::new(),
            next_id: 1,
        }
    }
}

/// Snapshot of operation counts served by an [`InMemoryDurableStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurableOpCounts {
    pub inserts: u64,
    pub point_reads: u64,
    pub scans: u64,
    pub deletes: u64,
}

impl DurableOpCounts {
    /// Total number of operations.
    pub fn total(&self) -> u64 {
        self.inserts + self.point_reads + self.scans + self.deletes
    }
}

/// Record table held in process memory.
///
/// Every insert yields to the scheduler while it is "in flight", so
/// concurrently issued inserts genuinely overlap; `max_in_flight` records the
/// peak overlap observed.
#[derive(Debug, Default)]
pub struct InMemoryDurableStore {
    table: Mutex<TableState>,
    latency: Option<Duration>,
    unavailable: AtomicBool,
    inserts: AtomicU64,
    point_reads: AtomicU64,
    scans: AtomicU64,
    deletes: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fixed simulated latency to every operation.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every subsequent operation fail with `AdapterUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Operation counts so far.
    pub fn op_counts(&self) -> DurableOpCounts {
        DurableOpCounts {
            inserts: self.inserts.load(Ordering::SeqCst),
            point_reads: self.point_reads.load(Ordering::SeqCst),
            scans: self.scans.load(Ordering::SeqCst),
            deletes: self.deletes.load(Ordering::SeqCst),
        }
    }

    /// Peak number of inserts that were in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.table().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn table(&self) -> MutexGuard<'_, TableState> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> TierResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TierError::unavailable(Tier::Durable, "connection refused"));
        }
        Ok(())
    }

    async fn simulate_io(&self) {
        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
    }
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn ensure_schema(&self) -> TierResult<()> {
        self.check_available()
    }

    async fn insert(&self, name: &str, email: &str) -> TierResult<Record> {
        self.check_available()?;
        self.inserts.fetch_add(1, Ordering::SeqCst);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.simulate_io().await;

        let mut table = self.table();
        if table.emails.contains(email) {
            return Err(TierError::DuplicateKey {
                email: email.to_string(),
            });
        }
        let record = Record {
            id: table.next_id,
            name: name.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        table.next_id += 1;
        table.emails.insert(record.email.clone());
        table.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: RecordId) -> TierResult<Option<Record>> {
        self.check_available()?;
        self.point_reads.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await;
        Ok(self.table().rows.get(&id).cloned())
    }

    async fn find_all(&self) -> TierResult<Vec<Record>> {
        self.check_available()?;
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await;
        Ok(self.table().rows.values().cloned().collect())
    }

    async fn delete_by_id(&self, id: RecordId) -> TierResult<u64> {
        self.check_available()?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await;

        let mut table = self.table();
        match table.rows.remove(&id) {
            Some(record) => {
                table.emails.remove(&record.email);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn count(&self) -> TierResult<u64> {
        self.check_available()?;
        Ok(self.table().rows.len() as u64)
    }
}

// ============================================================================
// CACHE
// ============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Snapshot of operation counts served by an [`InMemoryCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOpCounts {
    pub gets: u64,
    pub hits: u64,
    pub sets: u64,
    pub deletes: u64,
    pub flushes: u64,
}

impl CacheOpCounts {
    /// Total number of operations (hits are a subset of gets).
    pub fn total(&self) -> u64 {
        self.gets + self.sets + self.deletes + self.flushes
    }

    /// Fraction of gets that found a live value (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        if self.gets == 0 {
            0.0
        } else {
            self.hits as f64 / self.gets as f64
        }
    }
}

/// Key/value cache with lazy TTL expiry held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    unavailable: AtomicBool,
    gets: AtomicU64,
    hits: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    flushes: AtomicU64,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with `AdapterUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Operation counts so far.
    pub fn op_counts(&self) -> CacheOpCounts {
        CacheOpCounts {
            gets: self.gets.load(Ordering::SeqCst),
            hits: self.hits.load(Ordering::SeqCst),
            sets: self.sets.load(Ordering::SeqCst),
            deletes: self.deletes.load(Ordering::SeqCst),
            flushes: self.flushes.load(Ordering::SeqCst),
        }
    }

    /// Whether a live (unexpired) entry exists, without counting as a get.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries()
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Raw value for a key, without counting as a get.
    pub fn peek(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries()
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries().values().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite a key directly, bypassing counters (test seeding).
    pub fn insert_raw(&self, key: &str, value: &str, ttl: Duration) {
        self.entries().insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> TierResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TierError::unavailable(Tier::Cache, "connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> TierResult<Option<String>> {
        self.check_available()?;
        self.gets.fetch_add(1, Ordering::SeqCst);

        let now = Instant::now();
        let mut entries = self.entries();
        let value = match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        };

        if value.is_some() {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(value)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> TierResult<()> {
        self.check_available()?;
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.entries().insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> TierResult<()> {
        self.check_available()?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.entries().remove(key);
        Ok(())
    }

    async fn flush_all(&self) -> TierResult<()> {
        self.check_available()?;
        self.flushes.fetch_add(1, Ordering::SeqCst);
        self.entries().clear();
        Ok(())
    }

    async fn ping(&self) -> TierResult<()> {
        self.check_available()
    }
}
