use super::*;
use crate::error::Error;
use crate::provider::LlmProvider;
use crate::retry::Retrier;
use crate::types::ProviderConfig;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> AnthropicProvider {
    let config = ProviderConfig::new(1, "claude", "claude-3-opus-20240229")
        .with_api_key("sk-ant-test-key-123")
        .with_base_url(server.uri())
        .with_pricing(0.003, 0.015);
    AnthropicProvider::new(config)
        .unwrap()
        .with_retrier(Retrier::new(1, Duration::from_millis(1)))
}

#[test]
fn test_settings() {
    let settings = AnthropicClient::settings();
    assert_eq!(settings.timeout, Duration::from_secs(60));
    assert_eq!(settings.retrier.initial_delay(), Duration::from_millis(500));
    assert_eq!(settings.retrier.attempts(), 3);
}

#[tokio::test]
async fn test_analyze_sends_messages_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test-key-123"))
        .and(header("anthropic-version", API_VERSION))
        .and(body_partial_json(serde_json::json!({
            "model": "claude-3-opus-20240229",
            "messages": [{"role": "user"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "msg_1",
            "content": [{"type": "text", "text": "{\"is_important\": true, \"priority\": \"high\"}"}],
            "usage": {"input_tokens": 120, "output_tokens": 30}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let p = provider(&server);
    let result = p.analyze("urgent: the server is down").await.unwrap();
    assert!(result.is_important);
    assert_eq!(result.priority, "high");
    assert_eq!(p.name(), "claude");

    let record = p.last_usage_record().unwrap();
    assert_eq!(record.input_tokens, 120);
    assert_eq!(record.output_tokens, 30);
}

#[tokio::test]
async fn test_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "type": "error",
            "error": {"type": "rate_limit_error", "message": "slow down"}
        })))
        .mount(&server)
        .await;

    let err = provider(&server).analyze("hi").await.unwrap_err();
    assert!(matches!(err, Error::RateLimit));
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = provider(&server).summarize(&["a".to_string()]).await.unwrap_err();
    match err {
        Error::Api(message) => assert!(message.contains("500")),
        other => panic!("unexpected error: {other:?}"),
    }
}
