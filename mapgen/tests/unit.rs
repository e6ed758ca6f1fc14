//! Unit tests for the map service facade and its HTTP routes
//!
//! The generator is a mockall double, so these focus on caching, error
//! mapping and request validation.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use mapgen::traits::MockMapGenerator;
use mapgen::{MapError, MapService};
use shared::{GeneratedMap, MapBatch, MapRequest, WorkerStatus};

fn batch_for(request: &MapRequest) -> MapBatch {
    let mut layout = serde_json::Map::new();
    layout.insert("seed".to_string(), Value::from(request.seed));

    let mut batch = MapBatch::new();
    batch.insert(GeneratedMap {
        id: 1,
        objects: Vec::new(),
        layout,
    });
    batch
}

fn generator_returning_batches(times: usize) -> MockMapGenerator {
    let mut generator = MockMapGenerator::new();
    generator
        .expect_generate()
        .times(times)
        .returning(|request| Ok(batch_for(&request)));
    generator.expect_status().returning(|| WorkerStatus::Running);
    generator
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_cache_hit_skips_generator() {
    let service = MapService::new(generator_returning_batches(1), 10);

    let first = service.map(MapRequest::new(1, 0, None)).await.unwrap();
    let second = service.map(MapRequest::new(1, 0, None)).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(service.cached_batches().await, 1);
}

#[tokio::test]
async fn test_act_is_part_of_the_key() {
    let service = MapService::new(generator_returning_batches(2), 10);

    service.map_by_id(1, 0, -1).await.unwrap();
    service.map_by_id(1, 0, 0).await.unwrap();

    assert_eq!(service.cached_batches().await, 2);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let mut generator = MockMapGenerator::new();
    let mut calls = 0;
    generator.expect_generate().times(2).returning(move |request| {
        calls += 1;
        if calls == 1 {
            Err(MapError::timeout("'done' after 0 maps", Duration::from_secs(30)))
        } else {
            Ok(batch_for(&request))
        }
    });
    let service = MapService::new(generator, 10);

    let err = service.map_by_id(9, 1, -1).await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(service.cached_batches().await, 0);

    service.map_by_id(9, 1, -1).await.unwrap();
    assert_eq!(service.cached_batches().await, 1);
}

#[tokio::test]
async fn test_invalid_request_never_reaches_generator() {
    let mut generator = MockMapGenerator::new();
    generator.expect_generate().never();
    let service = MapService::new(generator, 10);

    let err = service.map_by_id(1, 3, -1).await.unwrap_err();
    assert!(matches!(err, MapError::SharedError(_)));
    assert!(service.map_by_id(1, 0, 5).await.is_err());
}

#[tokio::test]
async fn test_least_recently_used_batch_is_evicted() {
    let service = MapService::new(generator_returning_batches(4), 2);

    service.map_by_id(1, 0, -1).await.unwrap();
    service.map_by_id(2, 0, -1).await.unwrap();
    service.map_by_id(1, 0, -1).await.unwrap(); // hit, refreshes seed 1
    service.map_by_id(3, 0, -1).await.unwrap(); // evicts seed 2
    service.map_by_id(2, 0, -1).await.unwrap(); // generated again

    assert_eq!(service.cached_batches().await, 2);
}

#[tokio::test]
async fn test_shutdown_stops_generator() {
    let mut generator = MockMapGenerator::new();
    generator.expect_shutdown().times(1).returning(|| Ok(()));
    let service = MapService::new(generator, 10);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_misses_after_shutdown_are_refused() {
    let mut generator = generator_returning_batches(1);
    generator.expect_shutdown().times(1).returning(|| Ok(()));
    let service = MapService::new(generator, 10);

    service.map_by_id(1, 0, -1).await.unwrap();
    service.shutdown().await.unwrap();

    let err = service.map_by_id(2, 0, -1).await.unwrap_err();
    assert!(matches!(err, MapError::QueueClosed), "got {err:?}");

    // Cached batches are still served
    assert!(service.map_by_id(1, 0, -1).await.is_ok());
}

#[tokio::test]
async fn test_map_route_returns_batch() {
    let service = Arc::new(MapService::new(generator_returning_batches(1), 10));
    let router = mapgen::web::build_router(service);

    let response = router.oneshot(get("/v1/map/42/1/-1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["1"]["id"], 1);
    assert_eq!(body["1"]["seed"], 42);
}

#[tokio::test]
async fn test_map_route_rejects_invalid_difficulty() {
    let mut generator = MockMapGenerator::new();
    generator.expect_generate().never();
    let router = mapgen::web::build_router(Arc::new(MapService::new(generator, 10)));

    let response = router.oneshot(get("/v1/map/42/7/-1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("difficulty"));
}

#[tokio::test]
async fn test_map_route_maps_worker_errors() {
    let mut generator = MockMapGenerator::new();
    generator
        .expect_generate()
        .returning(|request| match request.seed {
            1 => Err(MapError::timeout("'done' after 0 maps", Duration::from_secs(30))),
            _ => Err(MapError::ProtocolViolation {
                command: "$seed 2".to_string(),
                expected: 2,
                raw: r#"{"seed":999}"#.to_string(),
            }),
        });
    let router = mapgen::web::build_router(Arc::new(MapService::new(generator, 10)));

    let timed_out = router.clone().oneshot(get("/v1/map/1/0/-1")).await.unwrap();
    assert_eq!(timed_out.status(), StatusCode::GATEWAY_TIMEOUT);

    let violated = router.oneshot(get("/v1/map/2/0/-1")).await.unwrap();
    assert_eq!(violated.status(), StatusCode::BAD_GATEWAY);
    assert!(body_json(violated).await["error"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn test_health_route() {
    let mut generator = MockMapGenerator::new();
    generator.expect_status().returning(|| WorkerStatus::Stopped);
    let router = mapgen::web::build_router(Arc::new(MapService::new(generator, 10)));

    let response = router.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["worker"], "stopped");
    assert_eq!(body["cached_batches"], 0);
    assert_eq!(body["pending_requests"], 0);
    assert_eq!(body["generating"], false);
}
