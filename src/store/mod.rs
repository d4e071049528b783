//! Key/value stores backing the tile cache.
//!
//! The tile cache only needs string keys, string values and per-key expiry,
//! which keeps the backend swappable:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               TileCache                 │
//! │     (hex encoding, error swallowing)    │
//! └────────────────────┬────────────────────┘
//!                      │ CacheStore
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │ RedisCacheStore │    │  MemoryCacheStore   │
//! │ (shared, remote)│    │ (in-process, LRU)   │
//! └─────────────────┘    └─────────────────────┘
//! ```

mod memory_store;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

pub use memory_store::{MemoryCacheStore, DEFAULT_MEMORY_CACHE_BYTES, DEFAULT_MEMORY_CACHE_ENTRIES};
pub use redis_store::RedisCacheStore;

/// A text key/value store with per-key expiry.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the value stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Short backend name for logs (e.g. `redis`).
    fn name(&self) -> &str;
}
