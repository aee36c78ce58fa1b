//! Adapter traits for the two storage tiers.
//!
//! Both traits are object-safe through `async_trait` and are implemented by
//! the in-memory adapters in this crate and by the PostgreSQL/Redis adapters
//! in tierbench-api. Adapters own no state beyond their connection handles.

use async_trait::async_trait;
use tierbench_core::{Record, RecordId, TierResult};

/// Durable, row-oriented record table.
///
/// # Schema
///
/// Implementations back a table with an auto-assigned integer id, a required
/// name, a required unique email and a creation timestamp defaulted at
/// insert time.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Create the record table if it does not exist.
    async fn ensure_schema(&self) -> TierResult<()>;

    /// Insert a new row and return it as stored (id and timestamp assigned).
    ///
    /// Fails with `TierError::DuplicateKey` when the email is taken.
    async fn insert(&self, name: &str, email: &str) -> TierResult<Record>;

    /// Point read by id.
    async fn find_by_id(&self, id: RecordId) -> TierResult<Option<Record>>;

    /// All rows, ordered by id.
    async fn find_all(&self) -> TierResult<Vec<Record>>;

    /// Delete by id, returning the number of affected rows.
    async fn delete_by_id(&self, id: RecordId) -> TierResult<u64>;

    /// Number of rows in the table.
    async fn count(&self) -> TierResult<u64>;
}

/// Key/value cache with per-key time-to-live.
///
/// Keys are opaque strings and values are opaque text; the access layer
/// always stores JSON.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value, or `None` when absent or expired.
    async fn get(&self, key: &str) -> TierResult<Option<String>>;

    /// Set a value that expires `ttl_seconds` after this write.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> TierResult<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> TierResult<()>;

    /// Remove every key in the cache.
    async fn flush_all(&self) -> TierResult<()>;

    /// Round-trip check used by health endpoints.
    async fn ping(&self) -> TierResult<()>;
}
