// Fixed (`any`) policies: repeatable responses, code normalization and the
// response envelope, driven through the real axum router.
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

async fn body_json(response: hyper::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn unregistered_endpoints_answer_404() {
    let app = test_app();
    let response = app
        .oneshot(json_request("POST", "/api/test", &json!({"x": 1})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registered_fixed_policy_answers_repeatedly() {
    let app = test_app();

    let registration = json!({
        "endpoint": "/api/test",
        "http_method": "POST",
        "any": {"code": 201, "payload": {"foo": "val"}}
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/_register", &registration))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"text": "cool"}));

    // a fixed policy never exhausts
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(empty_request("POST", "/api/test"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await, json!({"foo": "val"}));
    }
}

#[tokio::test]
async fn unspecified_code_emits_200() {
    let app = test_app();

    let registration = json!({
        "endpoint": "/zero",
        "http_method": "GET",
        "any": {"code": 0, "payload": {"ok": true}}
    });
    app.clone()
        .oneshot(json_request("POST", "/_register", &registration))
        .await
        .unwrap();

    let response = app.oneshot(empty_request("GET", "/zero")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"ok": true}));
}

#[tokio::test]
async fn error_codes_pass_through_with_an_empty_body() {
    let app = test_app();

    let registration = json!({
        "endpoint": "/api/test",
        "http_method": "POST",
        "any": {"code": 403, "payload": {"foo": "val"}}
    });
    app.clone()
        .oneshot(json_request("POST", "/_register", &registration))
        .await
        .unwrap();

    let response = app
        .oneshot(empty_request("POST", "/api/test"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn the_registered_method_is_part_of_the_identity() {
    let app = test_app();

    let registration = json!({
        "endpoint": "/api/test",
        "http_method": "POST",
        "any": {"code": 200, "payload": {}}
    });
    app.clone()
        .oneshot(json_request("POST", "/_register", &registration))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/test"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(empty_request("POST", "/api/test"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn re_registration_fully_replaces_the_policy() {
    let app = test_app();

    for payload in [json!({"a": 1}), json!({"b": 2})] {
        let registration = json!({
            "endpoint": "/api/test",
            "http_method": "GET",
            "any": {"code": 200, "payload": payload}
        });
        app.clone()
            .oneshot(json_request("POST", "/_register", &registration))
            .await
            .unwrap();
    }

    let response = app.oneshot(empty_request("GET", "/api/test")).await.unwrap();
    assert_eq!(body_json(response).await, json!({"b": 2}));
}

#[tokio::test]
async fn home_returns_the_service_descriptor() {
    let app = test_app();

    let response = app.oneshot(empty_request("GET", "/_")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let descriptor = body_json(response).await;
    assert_eq!(descriptor["app_name"], "decoy");
    assert_eq!(descriptor["details"], "Fake JSON API response");
    assert!(descriptor["version"].is_string());
}
