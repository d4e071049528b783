//! HTTP server layer.
//!
//! This module provides the HTTP API for serving vector tiles.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │            GET /tiles/{layer}/{z}/{x}/{y}.mvt                   │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │   viewer    │  │        routes           │  │
//! │  │ (requests)  │  │ (MapLibre)  │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;
mod viewer;

pub use handlers::{
    health_handler, tile_handler, viewer_handler, AppState, ErrorResponse, HandlerError,
    HealthResponse, TilePathParams, CACHE_HIT_HEADER, MVT_CONTENT_TYPE,
};
pub use routes::{create_router, RouterConfig};
