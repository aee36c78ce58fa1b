//! Configuration types

use std::time::Duration;

/// Default time-to-live for every cache entry written by the access layer.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Configuration for the cache-aside access layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    /// TTL applied to per-record and aggregate cache entries.
    pub cache_ttl: Duration,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl AccessConfig {
    /// Create a new access config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `TIERBENCH_CACHE_TTL_SECS`, falling back to the default.
    pub fn from_env() -> Self {
        let cache_ttl = std::env::var("TIERBENCH_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL);

        Self { cache_ttl }
    }

    /// Set the cache TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// TTL in whole seconds, never below one (Redis rejects `EX 0`).
    pub fn ttl_seconds(&self) -> u64 {
        self.cache_ttl.as_secs().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttl() {
        let config = AccessConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.ttl_seconds(), 3600);
    }

    #[test]
    fn test_ttl_seconds_floor() {
        let config = AccessConfig::new().with_ttl(Duration::from_millis(200));
        assert_eq!(config.ttl_seconds(), 1);
    }
}
