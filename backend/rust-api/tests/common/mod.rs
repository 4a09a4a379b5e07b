#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use longtext_question::{config::Config, create_router, services::AppState};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub fn create_test_app() -> Router {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let config = Config {
        max_answer_bytes: 64,
        ..Config::default()
    };
    create_router(Arc::new(AppState::new(config)))
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Opens a session and returns its id together with the initial view.
pub async fn open_question(app: &Router, body: Value) -> (String, Value) {
    let (status, json) = send(app, "POST", "/api/v1/questions", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "open failed: {}", json);
    let session_id = json["session_id"].as_str().unwrap().to_string();
    (session_id, json["view"].clone())
}
