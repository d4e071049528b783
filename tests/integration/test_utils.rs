//! Test utilities for integration tests.
//!
//! Provides a counting mock tile encoder, a cache store that always fails,
//! and helpers for building routers over them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use bytes::Bytes;

use mvt_streamer::error::{CacheError, EncodeError};
use mvt_streamer::geo::BoundingBox;
use mvt_streamer::store::{CacheStore, MemoryCacheStore};
use mvt_streamer::tile::{TileCache, TileEncoder, TileService, WriteMode};
use mvt_streamer::{create_router, RouterConfig};

/// Layer served by the test routers.
pub const TEST_LAYER: &str = "pune_roads";

// =============================================================================
// Mock Tile Encoder
// =============================================================================

/// Tile encoder returning a fixed payload (or a fixed error) and counting calls.
///
/// Clones share the call counter, so a test can keep a clone after handing
/// the encoder to a service.
#[derive(Clone)]
pub struct MockTileEncoder {
    payload: Bytes,
    error: Option<String>,
    calls: Arc<AtomicUsize>,
    bboxes: Arc<Mutex<Vec<BoundingBox>>>,
}

impl MockTileEncoder {
    /// Encoder answering every box with `payload`.
    pub fn returning(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            error: None,
            calls: Arc::new(AtomicUsize::new(0)),
            bboxes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Encoder answering every box with an empty tile.
    pub fn empty() -> Self {
        Self::returning(Bytes::new())
    }

    /// Encoder failing every call with a query error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::empty()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Bounding boxes received, in call order.
    pub fn bboxes(&self) -> Vec<BoundingBox> {
        self.bboxes.lock().unwrap().clone()
    }
}

#[async_trait]
impl TileEncoder for MockTileEncoder {
    async fn encode(&self, _layer: &str, bbox: &BoundingBox) -> Result<Bytes, EncodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bboxes.lock().unwrap().push(*bbox);

        match self.error {
            Some(ref message) => Err(EncodeError::Query(message.clone())),
            None => Ok(self.payload.clone()),
        }
    }
}

// =============================================================================
// Failing Cache Store
// =============================================================================

/// Cache store whose every call fails as an unreachable server would.
#[derive(Default)]
pub struct FailingStore {
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Connection("Connection refused (os error 111)".to_string()))
    }

    async fn set_ex(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Connection("Connection refused (os error 111)".to_string()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::Connection("Connection refused (os error 111)".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

// =============================================================================
// Router Helpers
// =============================================================================

/// Build a router over `encoder` and `store` with inline cache writes, so the
/// cache state is settled when a response arrives.
pub fn router_with(
    encoder: MockTileEncoder,
    store: Arc<dyn CacheStore>,
    config: RouterConfig,
) -> Router {
    let service = TileService::new(TEST_LAYER, encoder, TileCache::new(store))
        .with_write_mode(WriteMode::Inline);
    create_router(service, config.with_tracing(false))
}

/// Build a router over `encoder` with a fresh in-memory store, returning the
/// store for inspection.
pub fn memory_router(encoder: MockTileEncoder) -> (Router, Arc<MemoryCacheStore>) {
    let store = Arc::new(MemoryCacheStore::new());
    let router = router_with(encoder, store.clone(), RouterConfig::new());
    (router, store)
}

/// GET request for `uri` with an empty body.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// A stand-in tile payload of `len` bytes.
pub fn sample_tile(len: usize) -> Bytes {
    // 0x1a is the field tag of an MVT layer
    let mut data = vec![0x1a];
    data.extend((1..len).map(|i| (i % 251) as u8));
    Bytes::from(data)
}
