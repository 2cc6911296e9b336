use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use super::common::*;
use crate::marketplace::directory::router::{directory_router, reputation_router};

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[tokio::test]
async fn top_workers_route_returns_ranked_views() {
    let reputation = ScriptedReputation::with(&[
        ("w-1", snapshot(14.0 / 3.0, 3)),
        ("w-2", snapshot(4.9, 10)),
    ]);
    let (engine, _provider) = engine(
        FixedProfiles::of(vec![profile("w-1", "Ada")]),
        FixedUsers::of(vec![user("w-2", Some("Grace")), user("w-3", Some("Linus"))]),
        reputation,
    );

    let response = directory_router(Arc::new(engine))
        .oneshot(get("/api/v1/directory/top-workers?limit=2"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let workers = body["workers"].as_array().expect("workers array");
    assert_eq!(workers.len(), 2);
    assert_eq!(workers[0]["id"], "w-2");
    assert_eq!(workers[0]["rank"], 1);
    assert_eq!(workers[0]["has_profile"], false);
    assert_eq!(workers[1]["id"], "w-1");
    assert_eq!(workers[1]["display_rating"], 4.7);
}

#[tokio::test]
async fn candidates_route_reports_degraded_source() {
    let (engine, _provider) = engine(
        FixedProfiles::failing(),
        FixedUsers::of(vec![user("w-1", Some("Ada"))]),
        ScriptedReputation::default(),
    );

    let response = directory_router(Arc::new(engine))
        .oneshot(get("/api/v1/directory/candidates?search=ad"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["degraded"], serde_json::json!(["profiled"]));
    assert_eq!(body["candidates"][0]["id"], "w-1");
    assert!(body["candidates"][0].get("rank").is_none());
}

#[tokio::test]
async fn directory_routes_are_unavailable_when_both_sources_fail() {
    let (engine, _provider) = engine(
        FixedProfiles::failing(),
        FixedUsers::failing(),
        ScriptedReputation::default(),
    );

    let response = directory_router(Arc::new(engine))
        .oneshot(get("/api/v1/directory/top-workers"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn reputation_route_returns_snapshot() {
    let provider = ScriptedReputation::with(&[("w-1", snapshot(4.5, 2))]);

    let response = reputation_router(Arc::new(provider))
        .oneshot(get("/api/v1/workers/w-1/reputation"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["worker_id"], "w-1");
    assert_eq!(body["reputation"]["total_ratings"], 2);
    assert_eq!(body["display_rating"], 4.5);
}
