//! PostGIS vector tile encoder.
//!
//! Builds one Mapbox Vector Tile per request with a single statement:
//! `ST_AsMVTGeom` clips and re-projects each matching geometry into tile
//! space and `ST_AsMVT` aggregates the rows into one layer.
//!
//! # Query Construction
//!
//! The statement text is fixed when the encoder is created. Table and column
//! names come from configuration, are checked to be plain identifiers and
//! then double-quoted. Everything that varies per request (the envelope
//! edges and the layer name) is bound as a parameter, so no request data is
//! ever formatted into SQL text.

use async_trait::async_trait;
use bytes::Bytes;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;
use tracing::debug;

use crate::error::EncodeError;
use crate::geo::{forward, inverse, BoundingBox};

/// Tile coordinate space size in MVT units.
pub const DEFAULT_EXTENT: u32 = 4096;

/// Extra space around the tile, in MVT units, kept when clipping.
pub const DEFAULT_BUFFER: u32 = 256;

/// Spatial reference of the source geometries and the envelope.
pub const DEFAULT_SRID: i32 = 4326;

/// Default PostgreSQL pool size.
pub const DEFAULT_POOL_SIZE: usize = 16;

/// Longest identifier PostgreSQL keeps without truncating.
const MAX_IDENTIFIER_LEN: usize = 63;

// =============================================================================
// Encoder Trait
// =============================================================================

/// Produces an encoded vector tile for a bounding box.
#[async_trait]
pub trait TileEncoder: Send + Sync {
    /// Encode every feature intersecting `bbox` into a tile whose single
    /// layer is named `layer`.
    ///
    /// A box without features yields an empty payload, not an error.
    async fn encode(&self, layer: &str, bbox: &BoundingBox) -> Result<Bytes, EncodeError>;
}

// =============================================================================
// Layer Configuration
// =============================================================================

/// Source table and encoding policy for a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerConfig {
    /// Source table, optionally schema-qualified (`schema.table`)
    pub table: String,

    /// Geometry column
    pub geometry_column: String,

    /// Attribute columns copied into each feature
    pub columns: Vec<String>,

    /// Rows where this column is NULL are left out of the layer
    pub filter_column: Option<String>,

    /// SRID of the geometry column
    pub srid: i32,

    /// MVT extent
    pub extent: u32,

    /// Clip buffer in MVT units
    pub buffer: u32,

    /// Whether geometries are clipped to the tile plus buffer
    pub clip: bool,
}

impl LayerConfig {
    /// Layer reading `table` with the road defaults: `wkb_geometry`,
    /// attributes `id`, `name` and `highway`, and rows without a `highway`
    /// classification filtered out.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            geometry_column: "wkb_geometry".to_string(),
            columns: vec!["id".to_string(), "name".to_string(), "highway".to_string()],
            filter_column: Some("highway".to_string()),
            srid: DEFAULT_SRID,
            extent: DEFAULT_EXTENT,
            buffer: DEFAULT_BUFFER,
            clip: true,
        }
    }

    pub fn with_geometry_column(mut self, column: impl Into<String>) -> Self {
        self.geometry_column = column.into();
        self
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_filter_column(mut self, column: Option<String>) -> Self {
        self.filter_column = column;
        self
    }

    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = srid;
        self
    }

    /// Check every configured name is a usable identifier.
    pub fn validate(&self) -> Result<(), EncodeError> {
        quote_qualified(&self.table)?;
        quote_identifier(&self.geometry_column)?;
        for column in &self.columns {
            quote_identifier(column)?;
        }
        if let Some(ref column) = self.filter_column {
            quote_identifier(column)?;
        }
        Ok(())
    }
}

// =============================================================================
// SQL Construction
// =============================================================================

/// Whether `name` is a plain SQL identifier: ASCII letters, digits and
/// underscores, not starting with a digit, at most 63 bytes.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_IDENTIFIER_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_identifier(name: &str) -> Result<String, EncodeError> {
    if is_valid_identifier(name) {
        Ok(format!("\"{}\"", name))
    } else {
        Err(EncodeError::InvalidIdentifier(name.to_string()))
    }
}

fn quote_qualified(name: &str) -> Result<String, EncodeError> {
    let parts = name
        .split('.')
        .map(quote_identifier)
        .collect::<Result<Vec<_>, _>>()?;
    if parts.len() > 2 {
        return Err(EncodeError::InvalidIdentifier(name.to_string()));
    }
    Ok(parts.join("."))
}

/// Envelope over four degree parameters starting at `$first`, reprojected
/// into the layer's SRID when it is not 4326.
fn envelope_sql(first: usize, srid: i32) -> String {
    let envelope = format!(
        "ST_MakeEnvelope(${}, ${}, ${}, ${}, {})",
        first,
        first + 1,
        first + 2,
        first + 3,
        DEFAULT_SRID
    );
    if srid == DEFAULT_SRID {
        envelope
    } else {
        format!("ST_Transform({}, {})", envelope, srid)
    }
}

/// Build the tile statement for `layer`.
///
/// Parameters: `$1..$4` clip envelope (min lon, min lat, max lon, max lat),
/// `$5` layer name, `$6..$9` index prefilter envelope. Both envelopes are
/// bound in degrees.
pub fn build_tile_query(layer: &LayerConfig) -> Result<String, EncodeError> {
    let table = quote_qualified(&layer.table)?;
    let geom = quote_identifier(&layer.geometry_column)?;

    let mut select = layer
        .columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Result<Vec<_>, _>>()?;
    select.push(format!(
        "ST_AsMVTGeom({geom}, {envelope}, {extent}, {buffer}, {clip}) AS geom",
        geom = geom,
        envelope = envelope_sql(1, layer.srid),
        extent = layer.extent,
        buffer = layer.buffer,
        clip = layer.clip,
    ));

    let mut conditions = Vec::new();
    if let Some(ref column) = layer.filter_column {
        conditions.push(format!("{} IS NOT NULL", quote_identifier(column)?));
    }
    conditions.push(format!("{} && {}", geom, envelope_sql(6, layer.srid)));

    Ok(format!(
        "SELECT ST_AsMVT(q, $5::text, {extent}, 'geom') FROM (SELECT {select} FROM {table} WHERE {conditions}) AS q",
        extent = layer.extent,
        select = select.join(", "),
        table = table,
        conditions = conditions.join(" AND "),
    ))
}

/// Grow `bbox` to cover the clip buffer.
///
/// Tile space is linear in Web Mercator meters, not in latitude, so the box
/// is widened there and unprojected again. The margin is twice the buffer's
/// share of the tile, so the result always contains everything
/// `ST_AsMVTGeom` can keep. Extra rows let through cost work, not
/// correctness.
pub fn prefilter_bbox(bbox: &BoundingBox, extent: u32, buffer: u32) -> BoundingBox {
    let ratio = 2.0 * f64::from(buffer) / f64::from(extent.max(1));
    let [min_x, min_y] = forward([bbox.min_lon, bbox.min_lat]);
    let [max_x, max_y] = forward([bbox.max_lon, bbox.max_lat]);
    let dx = (max_x - min_x).abs() * ratio;
    let dy = (max_y - min_y).abs() * ratio;

    let [min_lon, min_lat] = inverse([min_x - dx, min_y - dy]);
    let [max_lon, max_lat] = inverse([max_x + dx, max_y + dy]);
    BoundingBox::new(min_lon, min_lat, max_lon, max_lat)
}

// =============================================================================
// PostGIS Encoder
// =============================================================================

/// Create a PostgreSQL connection pool from a connection URL.
///
/// No connection is opened until the pool is first used.
pub fn create_pg_pool(database_url: &str, max_size: usize) -> Result<Pool, EncodeError> {
    let mut cfg = Config::new();
    cfg.url = Some(database_url.to_string());
    cfg.pool = Some(PoolConfig::new(max_size));
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| EncodeError::Pool(format!("Failed to create pool: {}", e)))
}

/// Report the PostGIS version, confirming the database is reachable and
/// has the extension installed.
pub async fn postgis_version(pool: &Pool) -> Result<String, EncodeError> {
    let conn = pool.get().await?;
    let row = conn.query_one("SELECT postgis_version()", &[]).await?;
    Ok(row.try_get::<_, String>(0)?)
}

/// Tile encoder backed by a PostGIS database.
#[derive(Clone)]
pub struct PostgisTileEncoder {
    pool: Pool,
    layer: LayerConfig,
    sql: String,
}

impl PostgisTileEncoder {
    /// Create an encoder for `layer` using connections from `pool`.
    pub fn new(pool: Pool, layer: LayerConfig) -> Result<Self, EncodeError> {
        let sql = build_tile_query(&layer)?;
        debug!(sql = %sql, "Prepared tile query");
        Ok(Self { pool, layer, sql })
    }

    /// The statement run for each tile.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn layer(&self) -> &LayerConfig {
        &self.layer
    }

    /// Report the PostGIS version of the encoder's database.
    pub async fn postgis_version(&self) -> Result<String, EncodeError> {
        postgis_version(&self.pool).await
    }
}

#[async_trait]
impl TileEncoder for PostgisTileEncoder {
    async fn encode(&self, layer: &str, bbox: &BoundingBox) -> Result<Bytes, EncodeError> {
        let prefilter = prefilter_bbox(bbox, self.layer.extent, self.layer.buffer);

        let conn = self.pool.get().await?;
        let stmt = conn.prepare_cached(&self.sql).await?;

        let params: [&(dyn ToSql + Sync); 9] = [
            &bbox.min_lon,
            &bbox.min_lat,
            &bbox.max_lon,
            &bbox.max_lat,
            &layer,
            &prefilter.min_lon,
            &prefilter.min_lat,
            &prefilter.max_lon,
            &prefilter.max_lat,
        ];
        let row = conn.query_one(&stmt, &params).await?;

        // The aggregate is NULL on some PostGIS versions when no row matched
        let tile: Option<Vec<u8>> = row.try_get(0)?;
        Ok(tile.map(Bytes::from).unwrap_or_default())
    }
}

// =============================================================================
// Tests
// =============================================================================
