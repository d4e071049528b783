//! Tile cache for encoded vector tiles.
//!
//! Wraps a [`CacheStore`] with the tile-specific rules:
//!
//! # Cache Key
//!
//! Tiles are keyed by `{layer}_{z}_{x}_{y}`. The three trailing numeric
//! fields never contain the separator, so a key always splits back into a
//! single tuple when read from the right, even for layer names that contain
//! underscores themselves.
//!
//! # Payload Encoding
//!
//! Stores hold text, so tile bytes are written as lowercase hex. An empty
//! tile is stored as an empty string and reads back as an empty tile, which
//! keeps "no features here" distinct from "not cached".
//!
//! # Failure Handling
//!
//! The cache is an optimization. Store errors are logged and reported as a
//! miss on read, and dropped on write.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::warn;

use crate::error::CacheError;
use crate::store::CacheStore;

/// Separator between the fields of a cache key.
pub const KEY_SEPARATOR: char = '_';

/// Default lifetime of a cached tile: one hour.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

// =============================================================================
// Cache Key
// =============================================================================

/// Cache key for an encoded tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileCacheKey(String);

impl TileCacheKey {
    /// Derive the key for tile `z/x/y` of `layer`.
    pub fn new(layer: &str, z: u8, x: u32, y: u32) -> Self {
        Self(format!(
            "{layer}{sep}{z}{sep}{x}{sep}{y}",
            sep = KEY_SEPARATOR
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TileCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Payload Encoding
// =============================================================================

/// Encode tile bytes as lowercase hex for a text store.
pub fn encode_payload(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode a stored hex string back into tile bytes.
pub fn decode_payload(text: &str) -> Result<Bytes, CacheError> {
    hex::decode(text)
        .map(Bytes::from)
        .map_err(|e| CacheError::InvalidPayload(e.to_string()))
}

// =============================================================================
// Tile Cache
// =============================================================================

/// Binary tile cache on top of a text [`CacheStore`].
///
/// Cloning is cheap and clones share the same store.
#[derive(Clone)]
pub struct TileCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl TileCache {
    /// Create a cache with the default one hour TTL.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_ttl(store, DEFAULT_CACHE_TTL)
    }

    /// Create a cache whose entries expire after `ttl`.
    pub fn with_ttl(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Get a tile from the cache.
    ///
    /// Returns `None` when the tile is absent, expired, unreadable, or the
    /// store could not be reached. Failures are logged at WARN.
    pub async fn get(&self, key: &TileCacheKey) -> Option<Bytes> {
        let text = match self.store.get(key.as_str()).await {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(e) => {
                warn!(
                    key = %key,
                    store = self.store.name(),
                    "Tile cache read failed, treating as miss: {}",
                    e
                );
                return None;
            }
        };

        match decode_payload(&text) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(key = %key, "Discarding cached tile: {}", e);
                None
            }
        }
    }

    /// Store a tile, replacing any previous value.
    ///
    /// Failures are logged at WARN and otherwise ignored.
    pub async fn put(&self, key: &TileCacheKey, data: &[u8]) {
        if let Err(e) = self.try_put(key, data).await {
            warn!(
                key = %key,
                store = self.store.name(),
                "Tile cache write failed: {}",
                e
            );
        }
    }

    /// Store a tile and report the outcome.
    pub async fn try_put(&self, key: &TileCacheKey, data: &[u8]) -> Result<(), CacheError> {
        self.store
            .set_ex(key.as_str(), encode_payload(data), self.ttl)
            .await
    }

    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }
}

// =============================================================================
// Tests
// =============================================================================
