//! Spherical Mercator tile math.
//!
//! Converts between WGS84 longitude/latitude, global pixel coordinates and
//! slippy-map tile bounds. The pixel grid at zoom `z` is `tile_size * 2^z`
//! pixels wide, with the origin at the north-west corner of the world.

use std::f64::consts::PI;

/// Default tile size in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Earth radius used by EPSG:3857.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the width of the EPSG:3857 world in meters.
pub const MAX_EXTENT: f64 = 20_037_508.342_789_244;

const D2R: f64 = PI / 180.0;
const R2D: f64 = 180.0 / PI;

/// Sine of the latitude is clamped to this to keep the projection finite at the poles.
const MAX_SIN_LAT: f64 = 0.9999;

// =============================================================================
// Bounding Box
// =============================================================================

/// Geographic extent of a tile in degrees (SRID 4326).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a bounding box from its four edges.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Edges as `[min_lon, min_lat, max_lon, max_lat]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// Whether all four edges are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

// =============================================================================
// Spherical Mercator
// =============================================================================

/// Spherical Mercator projection for a fixed tile size.
#[derive(Debug, Clone, Copy)]
pub struct SphericalMercator {
    tile_size: f64,
}

impl SphericalMercator {
    /// Projection for 256 pixel tiles.
    pub fn new() -> Self {
        Self::with_tile_size(DEFAULT_TILE_SIZE)
    }

    /// Projection for a custom tile size.
    pub fn with_tile_size(tile_size: u32) -> Self {
        Self {
            tile_size: f64::from(tile_size),
        }
    }

    /// Tile size in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size as u32
    }

    /// World size in pixels at `zoom`.
    #[inline]
    fn world_pixels(&self, zoom: u8) -> f64 {
        self.tile_size * 2f64.powi(i32::from(zoom))
    }

    /// Project a `[lon, lat]` pair to global pixel coordinates at `zoom`.
    ///
    /// Results are rounded to whole pixels and clamped to the world size on
    /// the high side.
    pub fn px(&self, lon_lat: [f64; 2], zoom: u8) -> [f64; 2] {
        let size = self.world_pixels(zoom);
        let half = size / 2.0;
        let per_degree = size / 360.0;
        let per_radian = size / (2.0 * PI);

        let f = (D2R * lon_lat[1]).sin().clamp(-MAX_SIN_LAT, MAX_SIN_LAT);
        let x = (half + lon_lat[0] * per_degree).round();
        let y = (half + 0.5 * ((1.0 + f) / (1.0 - f)).ln() * -per_radian).round();

        [x.min(size), y.min(size)]
    }

    /// Unproject global pixel coordinates at `zoom` to `[lon, lat]`.
    pub fn ll(&self, px: [f64; 2], zoom: u8) -> [f64; 2] {
        let size = self.world_pixels(zoom);
        let half = size / 2.0;
        let per_degree = size / 360.0;
        let per_radian = size / (2.0 * PI);

        let g = (px[1] - half) / -per_radian;
        let lon = (px[0] - half) / per_degree;
        let lat = R2D * (2.0 * g.exp().atan() - 0.5 * PI);
        [lon, lat]
    }

    /// Bounds of tile `(x, y)` at zoom `z` in degrees.
    ///
    /// With `tms_style` the row is counted from the bottom of the pyramid
    /// instead of the top. The arithmetic is done in floating point, so any
    /// input produces a box; rows and columns outside `[0, 2^z)` simply land
    /// outside the valid world.
    pub fn bbox(&self, x: u32, y: u32, z: u8, tms_style: bool) -> BoundingBox {
        let x = f64::from(x);
        let y = if tms_style {
            (2f64.powi(i32::from(z)) - 1.0) - f64::from(y)
        } else {
            f64::from(y)
        };

        let lower_left = self.ll([x * self.tile_size, (y + 1.0) * self.tile_size], z);
        let upper_right = self.ll([(x + 1.0) * self.tile_size, y * self.tile_size], z);

        BoundingBox::new(lower_left[0], lower_left[1], upper_right[0], upper_right[1])
    }
}

impl Default for SphericalMercator {
    fn default() -> Self {
        Self::new()
    }
}

/// Project `[lon, lat]` degrees to EPSG:3857 meters, clamped to the world extent.
pub fn forward(lon_lat: [f64; 2]) -> [f64; 2] {
    let x = EARTH_RADIUS * lon_lat[0] * D2R;
    let y = EARTH_RADIUS * (0.25 * PI + 0.5 * lon_lat[1] * D2R).tan().ln();
    [
        x.clamp(-MAX_EXTENT, MAX_EXTENT),
        y.clamp(-MAX_EXTENT, MAX_EXTENT),
    ]
}

/// Unproject EPSG:3857 meters to `[lon, lat]` degrees.
///
/// Not clamped: meters past the world extent map to latitudes beyond the
/// Web Mercator limit, still short of the poles.
pub fn inverse(xy: [f64; 2]) -> [f64; 2] {
    let lon = xy[0] / EARTH_RADIUS * R2D;
    let lat = R2D * (2.0 * (xy[1] / EARTH_RADIUS).exp().atan() - 0.5 * PI);
    [lon, lat]
}

// =============================================================================
// Tests
// =============================================================================
