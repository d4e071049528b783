//! Router configuration for the tile server.
//!
//! This module defines the HTTP routes and applies middleware for CORS,
//! compression and request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                          - Health check
//! /tiles/{layer}/{z}/{x}/{y}.mvt   - Tile endpoint
//! /view                            - Map viewer
//! /*                               - Static files (when a static directory is configured)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mvt_streamer::server::{create_router, RouterConfig};
//! use mvt_streamer::tile::TileService;
//!
//! let tile_service = TileService::new("pune_roads", encoder, cache);
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(tile_service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, tile_handler, viewer_handler, AppState};
use crate::tile::{TileEncoder, TileService};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Whether to gzip responses for clients that accept it
    pub enable_compression: bool,

    /// Directory served for paths no route matches
    pub static_dir: Option<PathBuf>,
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Cache max-age is 1 hour (3600 seconds)
    /// - Tracing and compression are enabled
    /// - No static directory is served
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            enable_tracing: true,
            enable_compression: true,
            static_dir: None,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Enable or disable response compression.
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }

    /// Serve files from `dir` for unmatched paths.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - Tile, viewer and health routes
/// - Static file fallback (optional)
/// - CORS configuration
/// - Gzip compression (optional)
/// - Request tracing (optional)
pub fn create_router<E>(tile_service: TileService<E>, config: RouterConfig) -> Router
where
    E: TileEncoder + 'static,
{
    let app_state = AppState::with_cache_max_age(tile_service, config.cache_max_age);

    // {filename} captures "{y}", "{y}.mvt" and "{y}.pbf"
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/tiles/{layer}/{z}/{x}/{filename}", get(tile_handler::<E>))
        .route("/view", get(viewer_handler::<E>))
        .with_state(app_state);

    if let Some(ref dir) = config.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router = router.layer(build_cors_layer(&config));

    if config.enable_compression {
        router = router.layer(CompressionLayer::new());
    }

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
