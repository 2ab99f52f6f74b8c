//! Integration tests for GET /health and the request ID header.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use http::Request;
use tower::ServiceExt;

use clark::api::{create_router, AppState, REQUEST_ID_HEADER};
use clark::Config;

fn app_with_env(pairs: &[(&str, &str)]) -> axum::Router {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config = Config::from_lookup(move |name| vars.get(name).cloned()).unwrap();
    create_router(AppState::new(Arc::new(config), reqwest::Client::new()))
}

async fn get_health(app: axum::Router) -> (http::HeaderMap, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .expect("read body");
    (headers, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_reports_deployment_and_configuration() {
    let (_, json) = get_health(app_with_env(&[])).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "clark");
    assert_eq!(json["deployment"], "development");
    assert_eq!(json["configured"], false);

    let (_, json) = get_health(app_with_env(&[
        ("NODE_ENV", "production"),
        ("ANTHROPIC_API_KEY", "sk-ant"),
    ]))
    .await;
    assert_eq!(json["deployment"], "production");
    assert_eq!(json["configured"], true);
}

#[tokio::test]
async fn test_every_response_gets_a_fresh_request_id() {
    let app = app_with_env(&[]);

    let (first, _) = get_health(app.clone()).await;
    let (second, _) = get_health(app).await;

    let first = first.get(REQUEST_ID_HEADER).unwrap().to_str().unwrap().to_string();
    let second = second.get(REQUEST_ID_HEADER).unwrap().to_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&first).is_ok());
    assert!(uuid::Uuid::parse_str(&second).is_ok());
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_unknown_route_still_tagged() {
    let response = app_with_env(&[])
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}
