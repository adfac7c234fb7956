// Probability-weighted status codes over a shared payload. Assertions stick
// to the deterministic corners of the distribution (total weight, zero
// weight, closed code sets).
use std::{sync::Arc, time::Duration};

use axum::{Router, body::Body};
use decoy::{
    adapters::{StubHandler, build_router},
    core::{EndpointRegistry, HistoryLog},
};
use http_body_util::BodyExt;
use hyper::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_app() -> Router {
    let registry = Arc::new(EndpointRegistry::new(Duration::from_secs(300)));
    let history = Arc::new(HistoryLog::new(Duration::from_secs(60)));
    build_router(Arc::new(StubHandler::new(registry, history)))
}

fn json_request(method: &str, path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn a_total_weight_pins_the_status() {
    let app = test_app();

    let registration = json!({
        "endpoint": "/always-unavailable",
        "http_method": "GET",
        "response_code_probabilities": {"503": 100}
    });
    app.clone()
        .oneshot(json_request("POST", "/_register", &registration))
        .await
        .unwrap();

    for _ in 0..10 {
        let response = app
            .clone()
            .oneshot(empty_request("GET", "/always-unavailable"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

#[tokio::test]
async fn the_shared_payload_comes_from_any() {
    let app = test_app();

    let registration = json!({
        "endpoint": "/created",
        "http_method": "POST",
        "any": {"code": 0, "payload": {"id": 42}},
        "response_code_probabilities": {"201": 100}
    });
    app.clone()
        .oneshot(json_request("POST", "/_register", &registration))
        .await
        .unwrap();

    let response = app
        .oneshot(empty_request("POST", "/created"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let payload: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(payload, json!({"id": 42}));
}

#[tokio::test]
async fn zero_total_weight_falls_back_to_the_method_default() {
    let app = test_app();

    for (method, expected) in [("POST", StatusCode::CREATED), ("GET", StatusCode::OK)] {
        let registration = json!({
            "endpoint": "/defaulting",
            "http_method": method,
            "response_code_probabilities": {"500": 0}
        });
        app.clone()
            .oneshot(json_request("POST", "/_register", &registration))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(empty_request(method, "/defaulting"))
            .await
            .unwrap();
        assert_eq!(response.status(), expected, "method {method}");
    }
}

#[tokio::test]
async fn draws_stay_inside_the_weighted_code_set() {
    let app = test_app();

    let registration = json!({
        "endpoint": "/coin-flip",
        "http_method": "GET",
        "response_code_probabilities": {"500": 50, "503": 50}
    });
    app.clone()
        .oneshot(json_request("POST", "/_register", &registration))
        .await
        .unwrap();

    for _ in 0..25 {
        let response = app
            .clone()
            .oneshot(empty_request("GET", "/coin-flip"))
            .await
            .unwrap();
        let status = response.status();
        assert!(
            status == StatusCode::INTERNAL_SERVER_ERROR
                || status == StatusCode::SERVICE_UNAVAILABLE,
            "unexpected status {status}"
        );
    }
}

#[tokio::test]
async fn probabilistic_policies_never_exhaust() {
    let app = test_app();

    let registration = json!({
        "endpoint": "/steady",
        "http_method": "GET",
        "any": {"payload": {"up": true}},
        "response_code_probabilities": {"200": 100}
    });
    app.clone()
        .oneshot(json_request("POST", "/_register", &registration))
        .await
        .unwrap();

    for _ in 0..15 {
        let response = app
            .clone()
            .oneshot(empty_request("GET", "/steady"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
