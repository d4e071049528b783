//! Tile Service for orchestrating tile generation.
//!
//! The TileService is the main entry point for tile requests. It orchestrates:
//! - Request validation
//! - Cache lookups
//! - Bounding box computation
//! - Tile encoding against the geometry store
//! - Result caching
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileService                             │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                    get_tile()                           │    │
//! │  │  1. Validate coords   4. Compute bbox                   │    │
//! │  │  2. Derive cache key  5. Encode tile                    │    │
//! │  │  3. Check cache       6. Cache (best effort) & return   │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌───────────┐      ┌──────────────────┐   ┌─────────────┐    │
//! │    │ TileCache │      │SphericalMercator │   │ TileEncoder │    │
//! │    └───────────┘      └──────────────────┘   └─────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use bytes::Bytes;
use tracing::{debug, error};

use crate::error::TileError;
use crate::geo::{SphericalMercator, TileCoord};

use super::cache::{TileCache, TileCacheKey};
use super::encoder::TileEncoder;

// =============================================================================
// Tile Request
// =============================================================================

/// A request for a tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    /// Layer name
    pub layer: String,

    /// Zoom level
    pub z: u8,

    /// Column (0-indexed from the west)
    pub x: u32,

    /// Row (0-indexed from the north)
    pub y: u32,
}

impl TileRequest {
    pub fn new(layer: impl Into<String>, z: u8, x: u32, y: u32) -> Self {
        Self {
            layer: layer.into(),
            z,
            x,
            y,
        }
    }

    pub fn coord(&self) -> TileCoord {
        TileCoord::new(self.z, self.x, self.y)
    }
}

// =============================================================================
// Tile Response
// =============================================================================

/// Response from the tile service.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// The encoded vector tile
    pub data: Bytes,

    /// Whether this tile was served from cache
    pub cache_hit: bool,
}

impl TileResponse {
    /// Whether the tile holds no features. HTTP callers answer these with
    /// "204 No Content".
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// =============================================================================
// Cache Write Mode
// =============================================================================

/// How freshly encoded tiles are written to the cache.
///
/// Write failures are logged and dropped in both modes; they never fail the
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Spawn the write and answer without waiting for it
    #[default]
    Background,

    /// Wait for the write before answering
    Inline,
}

// =============================================================================
// Tile Service
// =============================================================================

/// Service for generating and caching tiles of a single layer.
///
/// # Type Parameters
///
/// * `E` - The tile encoder (e.g., PostGIS-backed)
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use mvt_streamer::store::MemoryCacheStore;
/// use mvt_streamer::tile::{TileCache, TileRequest, TileService};
///
/// let cache = TileCache::new(Arc::new(MemoryCacheStore::new()));
/// let service = TileService::new("pune_roads", encoder, cache);
///
/// let response = service.get_tile(TileRequest::new("pune_roads", 10, 722, 458)).await?;
/// println!("{} bytes, cache hit: {}", response.data.len(), response.cache_hit);
/// ```
pub struct TileService<E: TileEncoder> {
    /// Name of the served layer
    layer: String,

    /// Encoder producing tiles on cache misses
    encoder: E,

    /// Cache for encoded tiles
    cache: TileCache,

    /// Tile pyramid projection
    mercator: SphericalMercator,

    /// Cache population strategy
    write_mode: WriteMode,
}

impl<E: TileEncoder> TileService<E> {
    /// Create a tile service for `layer`.
    pub fn new(layer: impl Into<String>, encoder: E, cache: TileCache) -> Self {
        Self {
            layer: layer.into(),
            encoder,
            cache,
            mercator: SphericalMercator::new(),
            write_mode: WriteMode::default(),
        }
    }

    /// Set how cache writes are performed.
    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    /// Get a tile, using cache when available.
    ///
    /// This is the main entry point for tile requests. It:
    /// 1. Checks the layer and validates the coordinates
    /// 2. Checks the cache for an existing tile
    /// 3. If not cached, computes the bounding box and encodes the tile
    /// 4. Caches and returns the result
    ///
    /// Cache failures are never surfaced; they behave as a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The layer is not served by this service
    /// - The coordinates are outside the tile pyramid
    /// - The encoder fails (nothing is cached in that case)
    pub async fn get_tile(&self, request: TileRequest) -> Result<TileResponse, TileError> {
        if request.layer != self.layer {
            return Err(TileError::LayerNotFound {
                layer: request.layer,
            });
        }

        let coord = request.coord();
        coord.validate()?;

        let cache_key = TileCacheKey::new(&self.layer, coord.z, coord.x, coord.y);

        // Check cache first
        if let Some(cached_data) = self.cache.get(&cache_key).await {
            debug!(key = %cache_key, bytes = cached_data.len(), "Tile cache hit");
            return Ok(TileResponse {
                data: cached_data,
                cache_hit: true,
            });
        }

        // Cache miss - need to generate tile
        debug!(key = %cache_key, "Tile cache miss");
        let tile_data = match self.generate_tile(&coord).await {
            Ok(data) => data,
            Err(e) => {
                error!(key = %cache_key, "Tile encoding failed: {}", e);
                return Err(e);
            }
        };

        self.store(cache_key, tile_data.clone()).await;

        Ok(TileResponse {
            data: tile_data,
            cache_hit: false,
        })
    }

    /// Encode a tile without touching the cache.
    pub async fn generate_tile(&self, coord: &TileCoord) -> Result<Bytes, TileError> {
        let bbox = coord.bbox(&self.mercator);
        let data = self.encoder.encode(&self.layer, &bbox).await?;
        Ok(data)
    }

    async fn store(&self, key: TileCacheKey, data: Bytes) {
        match self.write_mode {
            WriteMode::Background => {
                let cache = self.cache.clone();
                tokio::spawn(async move {
                    cache.put(&key, &data).await;
                });
            }
            WriteMode::Inline => self.cache.put(&key, &data).await,
        }
    }

    /// Name of the served layer.
    pub fn layer(&self) -> &str {
        &self.layer
    }

    /// The tile cache.
    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// The tile encoder.
    pub fn encoder(&self) -> &E {
        &self.encoder
    }
}

// =============================================================================
// Tests
// =============================================================================
