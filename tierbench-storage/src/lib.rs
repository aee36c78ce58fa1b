//! TIERBENCH Storage - Tier Adapters and Cache-Aside Access Layer
//!
//! Defines the two adapter seams (`DurableStore`, `CacheStore`), in-memory
//! implementations of both for tests and local runs, and the
//! `RecordAccessLayer` that composes them with explicit invalidation rules.
//! The PostgreSQL and Redis adapters live in tierbench-api.

pub mod access;
pub mod memory;
pub mod traits;

pub use access::{AccessStats, RecordAccessLayer};
pub use memory::{CacheOpCounts, DurableOpCounts, InMemoryCache, InMemoryDurableStore};
pub use traits::{CacheStore, DurableStore};
