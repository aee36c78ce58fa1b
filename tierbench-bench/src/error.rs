//! Benchmark error types

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tierbench_core::TierError;

/// Phases of a benchmark run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchPhase {
    Populate,
    WarmCache,
    DurableReads,
    CacheReads,
    Cleanup,
}

impl fmt::Display for BenchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BenchPhase::Populate => "population",
            BenchPhase::WarmCache => "cache warm-up",
            BenchPhase::DurableReads => "durable read loop",
            BenchPhase::CacheReads => "cache read loop",
            BenchPhase::Cleanup => "cleanup",
        };
        f.write_str(label)
    }
}

/// Errors that abort a benchmark run.
///
/// Every runtime variant names the phase that failed so an aborted run never
/// produces a partial report.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BenchError {
    #[error("{phase} failed: {source}")]
    Adapter {
        phase: BenchPhase,
        #[source]
        source: TierError,
    },

    #[error("{phase} assertion failed: {reason}")]
    Assertion { phase: BenchPhase, reason: String },

    #[error("{phase} timed out after {limit:?}")]
    Timeout { phase: BenchPhase, limit: Duration },

    #[error("Invalid benchmark configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl BenchError {
    /// Wrap an adapter error raised during `phase`.
    pub fn adapter(phase: BenchPhase, source: TierError) -> Self {
        Self::Adapter { phase, source }
    }

    /// Create an Assertion error.
    pub fn assertion(phase: BenchPhase, reason: impl Into<String>) -> Self {
        Self::Assertion {
            phase,
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// The phase that failed, if the error came from a running benchmark.
    pub fn phase(&self) -> Option<BenchPhase> {
        match self {
            BenchError::Adapter { phase, .. }
            | BenchError::Assertion { phase, .. }
            | BenchError::Timeout { phase, .. } => Some(*phase),
            BenchError::InvalidConfig { .. } => None,
        }
    }

    /// Whether this is a result-integrity failure rather than an I/O failure.
    pub fn is_assertion(&self) -> bool {
        matches!(self, BenchError::Assertion { .. })
    }
}

/// Result type alias for benchmark operations.
pub type BenchResult<T> = Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tierbench_core::Tier;

    #[test]
    fn test_error_names_phase() {
        let err = BenchError::adapter(
            BenchPhase::Populate,
            TierError::unavailable(Tier::Durable, "connection refused"),
        );
        assert_eq!(err.phase(), Some(BenchPhase::Populate));
        assert!(err.to_string().starts_with("population failed"));
    }

    #[test]
    fn test_assertion_is_distinct() {
        let err = BenchError::assertion(BenchPhase::CacheReads, "id mismatch");
        assert!(err.is_assertion());
        assert_eq!(err.to_string(), "cache read loop assertion failed: id mismatch");

        let timeout = BenchError::Timeout {
            phase: BenchPhase::DurableReads,
            limit: Duration::from_secs(1),
        };
        assert!(!timeout.is_assertion());
    }

    #[test]
    fn test_config_error_has_no_phase() {
        assert_eq!(BenchError::invalid_config("batch size is zero").phase(), None);
    }
}
