//! Error types for tier operations

use crate::Tier;
use std::fmt;
use thiserror::Error;

/// Errors surfaced by the durable store, the cache, and the access layer.
///
/// A missing record is not an error: lookups return `Ok(None)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TierError {
    #[error("Duplicate key: a record with email {email} already exists")]
    DuplicateKey { email: String },

    #[error("{tier} tier unavailable: {reason}")]
    AdapterUnavailable { tier: Tier, reason: String },

    #[error("{tier} tier query failed: {reason}")]
    QueryFailed { tier: Tier, reason: String },

    #[error("Cache value under {key} could not be (de)serialized: {reason}")]
    Serialization { key: String, reason: String },
}

impl TierError {
    /// Create an AdapterUnavailable error.
    pub fn unavailable(tier: Tier, reason: impl fmt::Display) -> Self {
        Self::AdapterUnavailable {
            tier,
            reason: reason.to_string(),
        }
    }

    /// Create a QueryFailed error.
    pub fn query_failed(tier: Tier, reason: impl fmt::Display) -> Self {
        Self::QueryFailed {
            tier,
            reason: reason.to_string(),
        }
    }

    /// Create a Serialization error for the given cache key.
    pub fn serialization(key: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Serialization {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// The tier that produced this error, when it is tier-specific.
    pub fn tier(&self) -> Option<Tier> {
        match self {
            TierError::DuplicateKey { .. } => Some(Tier::Durable),
            TierError::AdapterUnavailable { tier, .. } | TierError::QueryFailed { tier, .. } => {
                Some(*tier)
            }
            TierError::Serialization { .. } => Some(Tier::Cache),
        }
    }
}

/// Result type alias for tier operations.
pub type TierResult<T> = Result<T, TierError>;
