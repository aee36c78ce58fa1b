//! Shared application state for the HTTP router.

use std::sync::Arc;
use std::time::Instant;

use tierbench_core::AccessConfig;
use tierbench_storage::{CacheStore, DurableStore, RecordAccessLayer};

/// Access layer over type-erased adapters, so the router is independent of
/// which backends were wired in.
pub type SharedLayer = RecordAccessLayer<dyn DurableStore, dyn CacheStore>;

#[derive(Clone)]
pub struct AppState {
    pub layer: SharedLayer,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(layer: SharedLayer) -> Self {
        Self {
            layer,
            start_time: Instant::now(),
        }
    }

    /// Build state from concrete adapters.
    pub fn from_adapters(
        durable: Arc<dyn DurableStore>,
        cache: Arc<dyn CacheStore>,
        config: AccessConfig,
    ) -> Self {
        Self::new(RecordAccessLayer::new(durable, cache, config))
    }
}
