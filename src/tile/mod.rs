//! Tile service layer.
//!
//! This module turns tile coordinates into encoded vector tiles, going to the
//! database only when the cache cannot answer.
//!
//! # Architecture
//!
//! The tile service sits between the HTTP layer and the geometry store:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  TileCache   │  │  TileEncoder    │  │
//! │  │  (hex text   │  │  (ST_AsMVT over │  │
//! │  │   with TTL)  │  │   the bbox)     │  │
//! │  └──────┬───────┘  └────────┬────────┘  │
//! └─────────┼───────────────────┼───────────┘
//!           ▼                   ▼
//! ┌──────────────────┐ ┌───────────────────┐
//! │    CacheStore    │ │      PostGIS      │
//! │ (Redis / memory) │ │                   │
//! └──────────────────┘ └───────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileService`]: Main entry point for tile requests, orchestrates the full pipeline
//! - [`TileCache`]: Hex-encoding, failure-tolerant wrapper around a cache store
//! - [`TileCacheKey`]: `{layer}_{z}_{x}_{y}` key for a tile
//! - [`TileEncoder`]: Produces a tile for a bounding box
//! - [`PostgisTileEncoder`]: `TileEncoder` running `ST_AsMVT` on PostGIS
//! - [`TileRequest`]: Parameters for a tile request
//! - [`TileResponse`]: Response containing tile data and metadata
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use mvt_streamer::store::MemoryCacheStore;
//! use mvt_streamer::tile::{TileCache, TileCacheKey};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = TileCache::new(Arc::new(MemoryCacheStore::new()));
//!     let key = TileCacheKey::new("pune_roads", 10, 722, 458);
//!
//!     if let Some(cached_tile) = cache.get(&key).await {
//!         println!("Cache hit: {} bytes", cached_tile.len());
//!     } else {
//!         let tile_data = vec![0x1a, 0x02];
//!         cache.put(&key, &tile_data).await;
//!     }
//! }
//! ```

mod cache;
mod encoder;
mod service;

pub use cache::{
    decode_payload, encode_payload, TileCache, TileCacheKey, DEFAULT_CACHE_TTL, KEY_SEPARATOR,
};
pub use encoder::{
    build_tile_query, create_pg_pool, is_valid_identifier, postgis_version, prefilter_bbox,
    LayerConfig, PostgisTileEncoder, TileEncoder, DEFAULT_BUFFER, DEFAULT_EXTENT,
    DEFAULT_POOL_SIZE, DEFAULT_SRID,
};
pub use service::{TileRequest, TileResponse, TileService, WriteMode};
