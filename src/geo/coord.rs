//! Slippy-map tile addressing.

use crate::error::TileError;

use super::mercator::{BoundingBox, SphericalMercator};

/// Deepest zoom level served. `2^30` rows and columns still fit in a `u32`.
pub const MAX_ZOOM: u8 = 30;

/// A tile address in the XYZ pyramid (row 0 at the top).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Zoom level
    pub z: u8,

    /// Column (0-indexed from the west)
    pub x: u32,

    /// Row (0-indexed from the north)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Number of columns (and rows) at zoom `z`.
    #[inline]
    pub fn tiles_per_side(z: u8) -> u64 {
        1u64 << z.min(63)
    }

    /// Check the address lies inside the pyramid.
    ///
    /// Rejects zoom levels above [`MAX_ZOOM`] and columns or rows outside
    /// `[0, 2^z)`.
    pub fn validate(&self) -> Result<(), TileError> {
        if self.z > MAX_ZOOM {
            return Err(TileError::InvalidZoom {
                z: self.z,
                max: MAX_ZOOM,
            });
        }

        let n = Self::tiles_per_side(self.z);
        if u64::from(self.x) >= n || u64::from(self.y) >= n {
            return Err(TileError::InvalidCoordinate {
                z: self.z,
                x: self.x,
                y: self.y,
            });
        }

        Ok(())
    }

    /// Geographic bounds of this tile.
    pub fn bbox(&self, mercator: &SphericalMercator) -> BoundingBox {
        mercator.bbox(self.x, self.y, self.z, false)
    }
}
