//! Endpoint tests against a temporary SQLite database

use super::*;
use crate::server::config::AppConfig;
use crate::server::AppContext;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request};
use msgflow_core::MemoryQueue;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const MASTER_KEY: &str = "0123456789abcdef0123456789abcdef";

struct TestApp {
    state: AppState,
    queue: Option<Arc<MemoryQueue>>,
    _dir: TempDir,
}

async fn test_app(with_queue: bool) -> TestApp {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        SqlStore::from_path(&dir.path().join("api.db"), Some(MASTER_KEY))
            .await
            .unwrap(),
    );
    let ctx = AppContext::from_store(AppConfig::default(), store);
    let queue = with_queue.then(|| Arc::new(MemoryQueue::new()));
    let state = AppState {
        store: ctx.store,
        service: ctx.service,
        queue: queue.clone().map(|q| q as Arc<dyn AnalysisQueue>),
        workers: None,
        health: None,
        events: EventBus::default(),
    };
    TestApp {
        state,
        queue,
        _dir: dir,
    }
}

async fn call(app: &TestApp, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-tenant-id", "1")
        .header("x-user-id", "admin@acme.test");
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = router(app.state.clone())
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health_needs_no_tenant() {
    let app = test_app(false).await;
    let response = router(app.state.clone())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_tenant_is_rejected() {
    let app = test_app(false).await;
    let response = router(app.state.clone())
        .oneshot(
            Request::get("/api/v1/llm/providers")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_provider_lifecycle() {
    let app = test_app(false).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/llm/providers",
        Some(json!({"provider_name": "openai", "api_key": "sk-secret", "is_default": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["api_key"], "****");
    assert_eq!(body["data"]["model_name"], "gpt-4-turbo");
    assert!(!body.to_string().contains("sk-secret"));

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/v1/llm/providers/{id}"),
        Some(json!({"model_name": "gpt-4o"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["model_name"], "gpt-4o");

    let (_, body) = call(&app, Method::GET, "/api/v1/llm/providers", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = call(
        &app,
        Method::GET,
        &format!("/api/v1/llm/providers/{id}/history"),
        None,
    )
    .await;
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["changed_by"], "admin@acme.test");

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/v1/llm/providers/{id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/v1/llm/providers/{id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_provider_writes_refresh_resolution() {
    let app = test_app(false).await;
    let (_, body) = call(
        &app,
        Method::POST,
        "/api/v1/llm/providers",
        Some(json!({"provider_name": "openai", "api_key": "sk-original", "is_default": true})),
    )
    .await;
    let id = body["data"]["id"].as_i64().unwrap();

    let llm = app.state.service.router();
    let before = llm.resolve(1, id).await.unwrap();
    assert_eq!(before.config.model_name, "gpt-4-turbo");

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/api/v1/llm/providers/{id}"),
        Some(json!({"model_name": "gpt-4o", "api_key": "sk-rotated"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let after = llm.resolve(1, id).await.unwrap();
    assert_eq!(after.config.model_name, "gpt-4o");
    assert_eq!(after.provider.config().api_key, "sk-rotated");
    assert!(!Arc::ptr_eq(&before.provider, &after.provider));
    assert_eq!(llm.resolve_default(1).await.unwrap().config.id, id);

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/api/v1/llm/providers/{id}"),
        Some(json!({"api_key": "sk-rotated-again"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rotated = llm.resolve(1, id).await.unwrap();
    assert_eq!(rotated.config.model_name, "gpt-4o");
    assert_eq!(rotated.provider.config().api_key, "sk-rotated-again");

    call(
        &app,
        Method::DELETE,
        &format!("/api/v1/llm/providers/{id}"),
        None,
    )
    .await;
    assert!(llm.resolve(1, id).await.is_err());
}

#[tokio::test]
async fn test_unsupported_vendor_is_bad_request() {
    let app = test_app(false).await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/llm/providers",
        Some(json!({"provider_name": "mistral", "api_key": "k"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("mistral"));
}

#[tokio::test]
async fn test_analyze_without_providers_uses_keyword_fallback() {
    let app = test_app(false).await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/llm/analyze",
        Some(json!({"message": "URGENT: server is down", "message_id": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["priority"], "high");
    assert_eq!(body["data"]["confidence"], 0.3);

    let stored = app.state.store.get_analysis(1, 5).await.unwrap().unwrap();
    assert!(stored.is_important);
    let (_, body) = call(&app, Method::GET, "/api/v1/llm/important", None).await;
    assert_eq!(body["data"][0]["message_id"], 5);
}

#[tokio::test]
async fn test_analyze_with_unknown_provider_is_not_found() {
    let app = test_app(false).await;
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/llm/analyze",
        Some(json!({"message": "hi", "provider_id": 404})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_limits() {
    let app = test_app(false).await;
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/llm/analyze/batch",
        Some(json!({"messages": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let messages: Vec<Value> = (0..101)
        .map(|i| json!({"message_id": i, "content": "hello"}))
        .collect();
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/llm/analyze/batch",
        Some(json!({ "messages": messages })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_runs_inline_without_queue() {
    let app = test_app(false).await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/llm/analyze/batch",
        Some(json!({"messages": [
            {"message_id": 1, "content": "thanks!"},
            {"message_id": 2, "content": "I am upset"}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["results"][1]["analysis"]["sentiment"], "negative");
    assert!(app.state.store.get_analysis(1, 2).await.unwrap().is_some());
}

#[tokio::test]
async fn test_batch_is_queued_when_queue_configured() {
    let app = test_app(true).await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/llm/analyze/batch",
        Some(json!({"messages": [
            {"message_id": 1, "content": "a"},
            {"message_id": 2, "content": "b"}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["status"], "queued");
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(app.queue.as_ref().unwrap().len(1), 2);
}

#[tokio::test]
async fn test_summarize_without_default_serves_canned_summary() {
    let app = test_app(false).await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/llm/summarize",
        Some(json!({"messages": ["hello", "bye"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sentiment"], "neutral");
    assert_eq!(body["data"]["topics"][0], "general");
}

#[tokio::test]
async fn test_reports_on_empty_tenant() {
    let app = test_app(false).await;

    let (status, body) = call(&app, Method::GET, "/api/v1/llm/usage", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_requests"], 0);
    assert_eq!(body["data"]["success_rate"], 0.0);

    let (status, body) = call(&app, Method::GET, "/api/v1/llm/costs?budget=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["budget_alert"], false);

    let (status, _) = call(&app, Method::GET, "/api/v1/llm/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, "/api/v1/llm/comparison", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_probe_of_missing_provider_is_not_found() {
    let app = test_app(false).await;
    let (status, _) = call(&app, Method::POST, "/api/v1/llm/providers/77/test", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test]
fn test_error_status_mapping() {
    use msgflow_llm::Error as Llm;
    let status = |e: ApiError| e.status();
    assert_eq!(
        status(msgflow_core::Error::Validation("x".into()).into()),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status(msgflow_core::Error::NotFound("x".into()).into()),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        status(msgflow_core::Error::Llm(Llm::DefaultProviderNotFound(1)).into()),
        StatusCode::NOT_FOUND
    );
    assert_eq!(status(Llm::RateLimit.into()), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(status(Llm::Api("boom".into()).into()), StatusCode::BAD_GATEWAY);
}
