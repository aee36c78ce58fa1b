//! TIERBENCH Test Utilities
//!
//! Shared test infrastructure for the TIERBENCH workspace:
//! - Proptest generators for records and record inputs
//! - Fixtures wiring the in-memory adapters into an access layer
//! - A fault-injecting cache for failure-path tests
//! - Assertions for `TierError` variants

pub use tierbench_core::{
    decode_record, encode_record, record_key, AccessConfig, Record, RecordId, Tier, TierError,
    TierResult, Timestamp, ALL_RECORDS_KEY,
};
pub use tierbench_storage::{
    CacheStore, DurableStore, InMemoryCache, InMemoryDurableStore, RecordAccessLayer,
};

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// FAULT INJECTION
// ============================================================================

/// Cache wrapper that can be told to misbehave.
///
/// Delegates to an `InMemoryCache` until a fault is armed:
/// - `fail_sets_after(n)`: the first `n` writes succeed, later writes fail
///   with `AdapterUnavailable`
/// - `corrupt_reads(true)`: every hit returns a record with a different id
#[derive(Debug, Default)]
pub struct FaultyCache {
    inner: InMemoryCache,
    sets: AtomicU64,
    sets_allowed: AtomicU64,
    limit_sets: AtomicBool,
    corrupt: AtomicBool,
}

impl FaultyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryCache {
        &self.inner
    }

    pub fn fail_sets_after(&self, allowed: u64) {
        self.sets_allowed.store(allowed, Ordering::SeqCst);
        self.limit_sets.store(true, Ordering::SeqCst);
    }

    pub fn corrupt_reads(&self, corrupt: bool) {
        self.corrupt.store(corrupt, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStore for FaultyCache {
    async fn get(&self, key: &str) -> TierResult<Option<String>> {
        let value = self.inner.get(key).await?;
        if !self.corrupt.load(Ordering::SeqCst) {
            return Ok(value);
        }
        match value.map(|raw| decode_record(key, &raw)).transpose()? {
            Some(mut record) => {
                record.id += 1_000_000;
                Ok(Some(encode_record(&record)?))
            }
            None => Ok(None),
        }
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> TierResult<()> {
        let n = self.sets.fetch_add(1, Ordering::SeqCst);
        if self.limit_sets.load(Ordering::SeqCst) && n >= self.sets_allowed.load(Ordering::SeqCst) {
            return Err(TierError::unavailable(Tier::Cache, "injected write failure"));
        }
        self.inner.set_with_expiry(key, value, ttl_seconds).await
    }

    async fn delete(&self, key: &str) -> TierResult<()> {
        self.inner.delete(key).await
    }

    async fn flush_all(&self) -> TierResult<()> {
        self.inner.flush_all().await
    }

    async fn ping(&self) -> TierResult<()> {
        self.inner.ping().await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating TIERBENCH inputs.

    use super::*;
    use proptest::prelude::*;

    /// Generate a Timestamp (DateTime<Utc>).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-2030
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(chrono::Utc::now)
        })
    }

    /// Generate a display name accepted by the create endpoint.
    pub fn arb_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z ]{0,40}"
    }

    /// Generate a syntactically valid email address.
    pub fn arb_email() -> impl Strategy<Value = String> {
        ("[a-z][a-z0-9]{0,15}", "[a-z]{1,10}", "[a-z]{2,4}")
            .prop_map(|(local, domain, tld)| format!("{}@{}.{}", local, domain, tld))
    }

    /// Generate a record as the durable store would return it.
    pub fn arb_record() -> impl Strategy<Value = Record> {
        (1i32..i32::MAX, arb_name(), arb_email(), arb_timestamp()).prop_map(
            |(id, name, email, created_at)| Record {
                id,
                name,
                email,
                created_at,
            },
        )
    }

    /// Generate a list of (name, email) pairs with pairwise-distinct emails.
    pub fn arb_unique_inputs(max: usize) -> impl Strategy<Value = Vec<(String, String)>> {
        prop::collection::vec(arb_name(), 0..=max).prop_map(|names| {
            names
                .into_iter()
                .enumerate()
                .map(|(i, name)| (name, format!("user{}@prop.test", i)))
                .collect()
        })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built adapters and access layers for common test scenarios.

    use super::*;

    /// Access layer over in-memory adapters, with handles kept for inspection.
    pub struct MemoryFixture {
        pub durable: Arc<InMemoryDurableStore>,
        pub cache: Arc<InMemoryCache>,
        pub layer: RecordAccessLayer<InMemoryDurableStore, InMemoryCache>,
    }

    /// Fresh in-memory adapters with the default TTL.
    pub fn memory_fixture() -> MemoryFixture {
        let durable = Arc::new(InMemoryDurableStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let layer = RecordAccessLayer::with_defaults(durable.clone(), cache.clone());
        MemoryFixture {
            durable,
            cache,
            layer,
        }
    }

    /// The same adapters erased to trait objects, as the HTTP layer holds them.
    pub fn dyn_layer(fixture: &MemoryFixture) -> RecordAccessLayer<dyn DurableStore, dyn CacheStore> {
        let durable: Arc<dyn DurableStore> = fixture.durable.clone();
        let cache: Arc<dyn CacheStore> = fixture.cache.clone();
        RecordAccessLayer::new(durable, cache, fixture.layer.config().clone())
    }

    /// Populate `count` records through the access layer.
    pub async fn seed_records<D, C>(layer: &RecordAccessLayer<D, C>, count: usize) -> Vec<Record>
    where
        D: DurableStore + ?Sized,
        C: CacheStore + ?Sized,
    {
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let record = layer
                .create(&format!("Seed {}", i), &format!("seed{}@fixture.test", i))
                .await
                .unwrap_or_else(|e| panic!("seeding record {} failed: {}", i, e));
            out.push(record);
        }
        out
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for `TierError` variants.

    use super::*;

    /// Assert that a TierResult is a DuplicateKey error for `email`.
    #[track_caller]
    pub fn assert_duplicate_key<T: std::fmt::Debug>(result: &TierResult<T>, email: &str) {
        match result {
            Err(TierError::DuplicateKey { email: e }) => assert_eq!(e, email),
            other => panic!("Expected DuplicateKey for {}, got: {:?}", email, other),
        }
    }

    /// Assert that a TierResult is an AdapterUnavailable error from `tier`.
    #[track_caller]
    pub fn assert_unavailable<T: std::fmt::Debug>(result: &TierResult<T>, tier: Tier) {
        match result {
            Err(TierError::AdapterUnavailable { tier: t, .. }) => assert_eq!(*t, tier),
            other => panic!("Expected AdapterUnavailable from {}, got: {:?}", tier, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::generators::*;
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_faulty_cache_fails_after_limit() {
        let cache = FaultyCache::new();
        cache.fail_sets_after(1);
        assert!(cache.set_with_expiry("a", "1", 60).await.is_ok());
        assert!(cache.set_with_expiry("b", "2", 60).await.is_err());
        assert!(cache.inner().contains_key("a"));
    }

    #[tokio::test]
    async fn test_faulty_cache_corrupts_ids() {
        let fixture = memory_fixture();
        let record = fixture.layer.create("Ada", "ada@test.com").await.unwrap();
        let cache = FaultyCache::new();
        let key = record_key(record.id);
        cache
            .set_with_expiry(&key, &encode_record(&record).unwrap(), 60)
            .await
            .unwrap();
        cache.corrupt_reads(true);

        let raw = cache.get(&key).await.unwrap().unwrap();
        assert_ne!(decode_record(&key, &raw).unwrap().id, record.id);
    }

    #[tokio::test]
    async fn test_seed_records() {
        let fixture = memory_fixture();
        let records = seed_records(&fixture.layer, 3).await;
        assert_eq!(records.len(), 3);
        assert_eq!(fixture.durable.len(), 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_emails_contain_at(email in arb_email()) {
            prop_assert!(email.contains('@'));
        }

        #[test]
        fn prop_unique_inputs_are_unique(inputs in arb_unique_inputs(20)) {
            let emails: std::collections::HashSet<_> = inputs.iter().map(|(_, e)| e).collect();
            prop_assert_eq!(emails.len(), inputs.len());
        }
    }
}
