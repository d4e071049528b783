//! HTTP request handlers for the vector tile API.
//!
//! This module contains the Axum handlers for serving tiles, the map viewer
//! and health checks.
//!
//! # Endpoints
//!
//! - `GET /tiles/{layer}/{z}/{x}/{y}.mvt` - Serve a tile
//! - `GET /view` - Map viewer for the served layer
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::TileError;
use crate::tile::{TileEncoder, TileRequest, TileService};

/// Media type of an encoded vector tile.
pub const MVT_CONTENT_TYPE: &str = "application/x-protobuf";

/// Header reporting whether the tile came from the cache.
pub const CACHE_HIT_HEADER: &str = "x-tile-cache-hit";

/// Tile file extensions accepted after the row number.
const TILE_EXTENSIONS: [&str; 2] = [".mvt", ".pbf"];

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the tile service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<E: TileEncoder> {
    /// The tile service for processing tile requests
    pub tile_service: Arc<TileService<E>>,

    /// Cache control max-age in seconds
    pub cache_max_age: u32,
}

impl<E: TileEncoder> AppState<E> {
    /// Create a new application state with custom cache max-age.
    pub fn with_cache_max_age(tile_service: TileService<E>, cache_max_age: u32) -> Self {
        Self {
            tile_service: Arc::new(tile_service),
            cache_max_age,
        }
    }
}

impl<E: TileEncoder> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            tile_service: Arc::clone(&self.tile_service),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for tile requests.
///
/// Extracted from: `/tiles/{layer}/{z}/{x}/{filename}`
/// where filename is `{y}`, `{y}.mvt` or `{y}.pbf`
///
/// Numbers are kept as text so that a malformed one is answered with the
/// JSON error body like every other tile error.
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    /// Layer name
    pub layer: String,

    /// Zoom level
    pub z: String,

    /// Tile column
    pub x: String,

    /// Tile row with optional extension (e.g., "342" or "342.mvt")
    pub filename: String,
}

impl TilePathParams {
    /// Parse the zoom level.
    pub fn z(&self) -> Result<u8, std::num::ParseIntError> {
        self.z.parse()
    }

    /// Parse the column.
    pub fn x(&self) -> Result<u32, std::num::ParseIntError> {
        self.x.parse()
    }

    /// Parse the row from the filename, stripping a known tile extension.
    pub fn y(&self) -> Result<u32, std::num::ParseIntError> {
        let y_str = TILE_EXTENSIONS
            .iter()
            .find_map(|ext| self.filename.strip_suffix(ext))
            .unwrap_or(&self.filename);
        y_str.parse()
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// Error type identifier (e.g., "encode_error", "invalid_coordinate")
    pub code: String,

    /// HTTP status code (included for convenience)
    pub status: u16,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, code: impl Into<String>, status: StatusCode) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            status: status.as_u16(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert TileError to HTTP response.
///
/// Errors are logged by severity: 404s at DEBUG, other 4xx at WARN and 5xx
/// at ERROR. Encoding failures are already logged by the tile service.
impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            TileError::InvalidZoom { .. } => (StatusCode::BAD_REQUEST, "invalid_zoom"),
            TileError::InvalidCoordinate { .. } => {
                (StatusCode::BAD_REQUEST, "invalid_coordinate")
            }
            TileError::LayerNotFound { .. } => (StatusCode::NOT_FOUND, "layer_not_found"),
            TileError::Encode(_) => (StatusCode::NOT_FOUND, "encode_error"),
        };

        error_response(status, code, self.to_string())
    }
}

/// Errors a tile request can fail with before or inside the tile service.
#[derive(Debug)]
pub enum HandlerError {
    /// The tile row could not be parsed from the path
    InvalidPath(String),

    /// The tile service rejected or failed the request
    Tile(TileError),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::InvalidPath(message) => {
                error_response(StatusCode::BAD_REQUEST, "invalid_path", message)
            }
            HandlerError::Tile(err) => err.into_response(),
        }
    }
}

impl From<TileError> for HandlerError {
    fn from(err: TileError) -> Self {
        HandlerError::Tile(err)
    }
}

fn error_response(status: StatusCode, code: &str, message: String) -> Response {
    if status.is_server_error() {
        error!(
            error_type = code,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = code,
            status = status.as_u16(),
            "Not found: {}",
            message
        );
    } else {
        warn!(
            error_type = code,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    (status, Json(ErrorResponse::new(message, code, status))).into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /tiles/{layer}/{z}/{x}/{y}.mvt`
///
/// # Response
///
/// - `200 OK`: Vector tile with `Content-Type: application/x-protobuf`
/// - `204 No Content`: The tile holds no features
/// - `400 Bad Request`: Coordinates outside the tile pyramid
/// - `404 Not Found`: Unknown layer, or the tile could not be encoded
///
/// # Headers
///
/// - `Content-Type: application/x-protobuf`
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Tile-Cache-Hit: true|false`
pub async fn tile_handler<E: TileEncoder + 'static>(
    State(state): State<AppState<E>>,
    Path(params): Path<TilePathParams>,
) -> Result<Response, HandlerError> {
    let z = params
        .z()
        .map_err(|_| HandlerError::InvalidPath(format!("Invalid zoom level: {}", params.z)))?;
    let x = params
        .x()
        .map_err(|_| HandlerError::InvalidPath(format!("Invalid tile column: {}", params.x)))?;
    let y = params
        .y()
        .map_err(|_| HandlerError::InvalidPath(format!("Invalid tile row: {}", params.filename)))?;

    let request = TileRequest::new(params.layer, z, x, y);
    let response = state.tile_service.get_tile(request).await?;

    let status = if response.is_empty() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        [
            (header::CONTENT_TYPE, MVT_CONTENT_TYPE.to_string()),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", state.cache_max_age),
            ),
            (
                HeaderName::from_static(CACHE_HIT_HEADER),
                response.cache_hit.to_string(),
            ),
        ],
        response.data,
    )
        .into_response())
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle viewer requests - serves an HTML page with a MapLibre GL map of
/// the served layer.
///
/// # Endpoint
///
/// `GET /view`
pub async fn viewer_handler<E: TileEncoder + 'static>(
    State(state): State<AppState<E>>,
    headers: HeaderMap,
) -> Html<String> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost:8080");

    // X-Forwarded-Proto is set behind a reverse proxy
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");

    let base_url = format!("{}://{}", proto, host);

    Html(super::viewer::generate_viewer_html(
        state.tile_service.layer(),
        &base_url,
    ))
}

// =============================================================================
// Tests
// =============================================================================
