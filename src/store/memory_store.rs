//! In-process cache store.
//!
//! An LRU map of string values with per-entry expiry. Entries are bounded
//! both by count and by the total size of the stored values; when either
//! bound is exceeded the least-recently-used entries are evicted. Expired
//! entries are dropped lazily when read.

use std::num::NonZeroUsize;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::CacheError;

use super::CacheStore;

/// Default maximum number of entries.
pub const DEFAULT_MEMORY_CACHE_ENTRIES: usize = 10_000;

/// Default maximum total value size: 256MB of hex text (128MB of tiles).
pub const DEFAULT_MEMORY_CACHE_BYTES: usize = 256 * 1024 * 1024;

struct Entry {
    value: String,
    expires_at: Instant,
}

struct Inner {
    entries: LruCache<String, Entry>,
    current_size: usize,
}

/// LRU cache store held in process memory.
///
/// Useful for single-instance deployments without Redis and for tests.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use mvt_streamer::store::{CacheStore, MemoryCacheStore};
///
/// #[tokio::main]
/// async fn main() {
///     let store = MemoryCacheStore::new();
///     store
///         .set_ex("pune_roads_0_0_0", "1a02".to_string(), Duration::from_secs(3600))
///         .await
///         .unwrap();
///     assert_eq!(store.get("pune_roads_0_0_0").await.unwrap().as_deref(), Some("1a02"));
/// }
/// ```
pub struct MemoryCacheStore {
    inner: RwLock<Inner>,
    max_size: usize,
}

impl MemoryCacheStore {
    /// Create a store with default bounds.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CACHE_ENTRIES, DEFAULT_MEMORY_CACHE_BYTES)
    }

    /// Create a store holding at most `max_entries` values totalling `max_size` bytes.
    ///
    /// A zero entry count is treated as one.
    pub fn with_capacity(max_entries: usize, max_size: usize) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: RwLock::new(Inner {
                entries: LruCache::new(max_entries),
                current_size: 0,
            }),
            max_size,
        }
    }

    /// Number of stored entries, including ones that have expired but not yet been read.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// Total size of stored values in bytes.
    pub async fn size(&self) -> usize {
        self.inner.read().await.current_size
    }

    /// Remove every entry.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.current_size = 0;
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut inner = self.inner.write().await;

        match inner.entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => {}
        }

        // Expired
        if let Some(entry) = inner.entries.pop(key) {
            inner.current_size = inner.current_size.saturating_sub(entry.value.len());
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut inner = self.inner.write().await;
        let value_size = value.len();
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };

        // push() hands back whichever entry left the map: the old value for
        // this key, or the LRU entry evicted to make room
        if let Some((_, old)) = inner.entries.push(key.to_string(), entry) {
            inner.current_size = inner.current_size.saturating_sub(old.value.len());
        }
        inner.current_size += value_size;

        while inner.current_size > self.max_size {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => {
                    inner.current_size = inner.current_size.saturating_sub(evicted.value.len());
                }
                None => break,
            }
        }

        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// =============================================================================
// Tests
// =============================================================================
