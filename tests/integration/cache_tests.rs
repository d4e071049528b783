//! Cache behaviour integration tests.
//!
//! Tests verify:
//! - Cache faults are invisible to clients
//! - Cached tiles expire after their TTL
//! - Background writes populate the cache
//! - Corrupt entries are recomputed
//! - Concurrent requests for distinct tiles stay distinct

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use http_body_util::BodyExt;
use tokio::task::JoinSet;
use tower::ServiceExt;

use mvt_streamer::store::{CacheStore, MemoryCacheStore};
use mvt_streamer::tile::{TileCache, TileRequest, TileService, WriteMode};
use mvt_streamer::{create_router, RouterConfig};

use super::test_utils::{
    get, memory_router, router_with, sample_tile, FailingStore, MockTileEncoder, TEST_LAYER,
};

// =============================================================================
// Cache Faults
// =============================================================================

#[tokio::test]
async fn test_unreachable_cache_falls_back_to_encoder() {
    let encoder = MockTileEncoder::returning(sample_tile(32));
    let store = Arc::new(FailingStore::new());
    let router = router_with(encoder.clone(), store.clone(), RouterConfig::new());

    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(get("/tiles/pune_roads/10/722/458.mvt"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-tile-cache-hit").unwrap(), "false");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, sample_tile(32));
    }

    // Every request read, missed, encoded and tried to write
    assert_eq!(encoder.call_count(), 2);
    assert_eq!(store.get_count(), 2);
    assert_eq!(store.set_count(), 2);
}

#[tokio::test]
async fn test_unreachable_cache_does_not_mask_encoder_errors() {
    let encoder = MockTileEncoder::failing("connection to server was lost");
    let store = Arc::new(FailingStore::new());
    let router = router_with(encoder, store.clone(), RouterConfig::new());

    let response = router
        .oneshot(get("/tiles/pune_roads/3/1/1.mvt"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(store.set_count(), 0);
}

#[tokio::test]
async fn test_corrupt_entry_is_recomputed_and_replaced() {
    let encoder = MockTileEncoder::returning(sample_tile(4));
    let (router, store) = memory_router(encoder.clone());
    store
        .set_ex(
            "pune_roads_2_1_1",
            "definitely not hex".to_string(),
            Duration::from_secs(3600),
        )
        .await
        .unwrap();

    let response = router
        .oneshot(get("/tiles/pune_roads/2/1/1.mvt"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-tile-cache-hit").unwrap(), "false");
    assert_eq!(encoder.call_count(), 1);
    assert_eq!(
        store.get("pune_roads_2_1_1").await.unwrap(),
        Some(hex::encode(sample_tile(4)))
    );
}

// =============================================================================
// Expiry
// =============================================================================

#[tokio::test]
async fn test_cached_tile_expires() {
    let encoder = MockTileEncoder::returning(sample_tile(8));
    let store = Arc::new(MemoryCacheStore::new());
    let cache = TileCache::with_ttl(store, Duration::from_millis(50));
    let service = TileService::new(TEST_LAYER, encoder.clone(), cache)
        .with_write_mode(WriteMode::Inline);

    let request = TileRequest::new(TEST_LAYER, 6, 44, 28);

    assert!(!service.get_tile(request.clone()).await.unwrap().cache_hit);
    assert!(service.get_tile(request.clone()).await.unwrap().cache_hit);

    tokio::time::sleep(Duration::from_millis(120)).await;

    assert!(!service.get_tile(request).await.unwrap().cache_hit);
    assert_eq!(encoder.call_count(), 2);
}

// =============================================================================
// Write Modes
// =============================================================================

#[tokio::test]
async fn test_background_writes_populate_cache() {
    let encoder = MockTileEncoder::returning(sample_tile(16));
    let store = Arc::new(MemoryCacheStore::new());
    let service = TileService::new(TEST_LAYER, encoder.clone(), TileCache::new(store.clone()));
    let router = create_router(service, RouterConfig::new().with_tracing(false));

    let response = router
        .clone()
        .oneshot(get("/tiles/pune_roads/8/180/114.mvt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut cached = None;
    for _ in 0..100 {
        cached = store.get("pune_roads_8_180_114").await.unwrap();
        if cached.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(cached, Some(hex::encode(sample_tile(16))));

    let response = router
        .oneshot(get("/tiles/pune_roads/8/180/114.mvt"))
        .await
        .unwrap();
    assert_eq!(response.headers().get("x-tile-cache-hit").unwrap(), "true");
    assert_eq!(encoder.call_count(), 1);
}

#[tokio::test]
async fn test_background_write_failure_does_not_affect_response() {
    let encoder = MockTileEncoder::returning(sample_tile(16));
    let store = Arc::new(FailingStore::new());
    let service = TileService::new(TEST_LAYER, encoder, TileCache::new(store.clone()));
    let router = create_router(service, RouterConfig::new().with_tracing(false));

    let response = router
        .oneshot(get("/tiles/pune_roads/8/180/114.mvt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Keys
// =============================================================================

#[tokio::test]
async fn test_concurrent_distinct_tiles_get_distinct_entries() {
    let encoder = MockTileEncoder::returning(sample_tile(8));
    let (router, store) = memory_router(encoder.clone());

    let uris: Vec<String> = (0..4u32)
        .flat_map(|x| (0..4u32).map(move |y| format!("/tiles/pune_roads/2/{}/{}.mvt", x, y)))
        .collect();

    let mut requests = JoinSet::new();
    for uri in &uris {
        requests.spawn(router.clone().oneshot(get(uri)));
    }

    while let Some(response) = requests.join_next().await {
        assert_eq!(response.unwrap().unwrap().status(), StatusCode::OK);
    }

    assert_eq!(encoder.call_count(), 16);
    assert_eq!(store.len().await, 16);
    for x in 0..4 {
        for y in 0..4 {
            let key = format!("pune_roads_2_{}_{}", x, y);
            assert!(store.get(&key).await.unwrap().is_some(), "missing {}", key);
        }
    }
}

#[tokio::test]
async fn test_layer_with_separator_in_name() {
    let encoder = MockTileEncoder::returning(sample_tile(8));
    let store = Arc::new(MemoryCacheStore::new());
    let service = TileService::new("city_roads_v2", encoder, TileCache::new(store.clone()))
        .with_write_mode(WriteMode::Inline);
    let router = create_router(service, RouterConfig::new().with_tracing(false));

    let response = router
        .oneshot(get("/tiles/city_roads_v2/1/0/1.mvt"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.get("city_roads_v2_1_0_1").await.unwrap().is_some());
}
