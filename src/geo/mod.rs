//! Geographic helpers: tile addressing and spherical Mercator projection.

mod coord;
mod mercator;

pub use coord::{TileCoord, MAX_ZOOM};
pub use mercator::{
    forward, inverse, BoundingBox, SphericalMercator, DEFAULT_TILE_SIZE, EARTH_RADIUS, MAX_EXTENT,
};
