use thiserror::Error;

/// Errors raised by a cache store backend.
///
/// These never reach a client: the tile cache logs them and falls back to
/// computing the tile.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Network or connection error talking to the cache
    #[error("Cache connection error: {0}")]
    Connection(String),

    /// The cache answered with something we did not expect
    #[error("Cache protocol error: {0}")]
    Protocol(String),

    /// A stored value could not be decoded back into tile bytes
    #[error("Invalid cached payload: {0}")]
    InvalidPayload(String),
}

/// Errors raised while encoding a tile against the geometry store.
#[derive(Debug, Clone, Error)]
pub enum EncodeError {
    /// No database connection could be obtained from the pool
    #[error("Database pool error: {0}")]
    Pool(String),

    /// The tile query failed to execute or returned an unexpected shape
    #[error("{0}")]
    Query(String),

    /// A configured table or column name is not a plain SQL identifier
    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// Errors that can occur while serving a tile request.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Zoom level beyond the supported pyramid depth
    #[error("Invalid zoom level {z} (maximum is {max})")]
    InvalidZoom { z: u8, max: u8 },

    /// Column or row outside `[0, 2^z)`
    #[error("Tile {z}/{x}/{y} is outside the tile pyramid")]
    InvalidCoordinate { z: u8, x: u32, y: u32 },

    /// The requested layer is not served by this deployment
    #[error("Layer not found: {layer}")]
    LayerNotFound { layer: String },

    /// The geometry store failed to produce a tile
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl From<tokio_postgres::Error> for EncodeError {
    fn from(err: tokio_postgres::Error) -> Self {
        EncodeError::Query(err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for EncodeError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        EncodeError::Pool(err.to_string())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Protocol(err.to_string())
        }
    }
}
