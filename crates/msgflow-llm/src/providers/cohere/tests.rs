use super::*;
use crate::provider::LlmProvider;
use crate::types::HealthStatus;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> CohereProvider {
    let config = ProviderConfig::new(5, "cohere", "command-r-plus")
        .with_api_key("co-test-key-98765")
        .with_base_url(server.uri())
        .with_pricing(0.0003, 0.0003);
    CohereProvider::new(config).unwrap()
}

#[test]
fn test_settings() {
    let settings = CohereClient::settings();
    assert_eq!(settings.timeout, Duration::from_secs(45));
    assert_eq!(settings.probe_max_tokens, 10);
}

#[tokio::test]
async fn test_analyze_reads_billed_units() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .and(header("authorization", "Bearer co-test-key-98765"))
        .and(body_partial_json(serde_json::json!({"model": "command-r-plus"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "gen-1",
            "generations": [{"id": "g", "text": " {\"sentiment\": \"positive\", \"confidence\": 0.8}"}],
            "meta": {"billed_units": {"input_tokens": 42, "output_tokens": 17}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let p = provider(&server);
    let result = p.analyze("Thanks, great job").await.unwrap();
    assert_eq!(result.sentiment, "positive");

    let record = p.last_usage_record().unwrap();
    assert_eq!(record.input_tokens, 42);
    assert_eq!(record.output_tokens, 17);
}

#[tokio::test]
async fn test_health_probe_uses_ten_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .and(body_partial_json(serde_json::json!({
            "prompt": "Respond with: OK",
            "max_tokens": 10
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "generations": [{"text": "OK"}],
            "meta": {"billed_units": {"input_tokens": 4, "output_tokens": 1}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server).health_check().await.unwrap();
    assert_eq!(result.status, HealthStatus::Ok);
}

#[tokio::test]
async fn test_health_probe_failure_is_reported_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server).health_check().await.unwrap();
    assert_eq!(result.status, HealthStatus::Error);
    assert!(result.error_message.unwrap().contains("503"));
}
