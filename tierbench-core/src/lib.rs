//! TIERBENCH Core - Record Types
//!
//! Plain data structures shared by every other crate: the `Record` entity,
//! the tier discriminator, cache key helpers and the JSON codec used for
//! cache values. No I/O lives here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;
pub mod error;

pub use config::AccessConfig;
pub use error::{TierError, TierResult};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Record identifier assigned by the durable store (`SERIAL` column).
pub type RecordId = i32;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

// ============================================================================
// ENTITIES
// ============================================================================

/// A user record as stored in the durable tier.
///
/// `id` and `created_at` are always assigned by the durable store; callers
/// never fabricate them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub created_at: Timestamp,
}

/// Storage tier discriminator used in samples, reports and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Relational table (PostgreSQL).
    Durable,
    /// In-memory key/value store (Redis).
    Cache,
}

impl Tier {
    /// Human-readable backend label.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Tier::Durable => "PostgreSQL",
            Tier::Cache => "Redis",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Durable => write!(f, "durable"),
            Tier::Cache => write!(f, "cache"),
        }
    }
}

// ============================================================================
// CACHE KEYS
// ============================================================================

/// Aggregate cache key holding the serialized collection of all records.
pub const ALL_RECORDS_KEY: &str = "users:all";

/// Prefix shared by every per-record cache key.
pub const RECORD_KEY_PREFIX: &str = "user:";

/// Per-record cache key.
pub fn record_key(id: RecordId) -> String {
    format!("{}{}", RECORD_KEY_PREFIX, id)
}

// ============================================================================
// CACHE VALUE CODEC
// ============================================================================

/// Serialize one record for storage under its per-record key.
pub fn encode_record(record: &Record) -> TierResult<String> {
    serde_json::to_string(record).map_err(|e| TierError::serialization(record_key(record.id), e))
}

/// Deserialize a per-record cache value.
pub fn decode_record(key: &str, raw: &str) -> TierResult<Record> {
    serde_json::from_str(raw).map_err(|e| TierError::serialization(key, e))
}

/// Serialize the full collection for the aggregate key.
pub fn encode_records(records: &[Record]) -> TierResult<String> {
    serde_json::to_string(records).map_err(|e| TierError::serialization(ALL_RECORDS_KEY, e))
}

/// Deserialize the aggregate cache value.
pub fn decode_records(raw: &str) -> TierResult<Vec<Record>> {
    serde_json::from_str(raw).map_err(|e| TierError::serialization(ALL_RECORDS_KEY, e))
}


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Decoding an encoded record yields the same record field by field.
        #[test]
        fn prop_record_codec_roundtrip(
            id in 1i32..i32::MAX,
            name in "[A-Za-z ]{1,40}",
            local in "[a-z0-9]{1,20}",
            secs in 0i64..4_000_000_000,
            micros in 0u32..1_000_000,
        ) {
            let record = Record {
                id,
                name,
                email: format!("{}@test.com", local),
                created_at: Utc.timestamp_opt(secs, micros * 1_000).unwrap(),
            };

            let raw = encode_record(&record).unwrap();
            let decoded = decode_record(&record_key(id), &raw).unwrap();

            prop_assert_eq!(decoded.id, record.id);
            prop_assert_eq!(&decoded.name, &record.name);
            prop_assert_eq!(&decoded.email, &record.email);
            prop_assert_eq!(decoded.created_at, record.created_at);
        }
    }
}
