//! Integration tests for the OpenAI-compatible backend.
//!
//! Uses wiremock for HTTP mocking: success, retry on 5xx, fatal 4xx,
//! malformed payloads.

use autointerp_core::providers::llm::openai::OpenAIClient;
use autointerp_core::{BackendConfig, GenerationParams, Generator, Message};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_client(mock_server: &MockServer, max_retries: u32) -> OpenAIClient {
    let config = BackendConfig {
        base_url: mock_server.uri(),
        model: "test-model".to_string(),
        max_retries,
        retry_base_ms: 1,
        timeout_secs: 5,
        ..Default::default()
    };
    OpenAIClient::new(&config, Some("test-key".to_string())).expect("failed to create client")
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "model": "test-model-2024",
        "choices": [{"message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 120, "completion_tokens": 8}
    })
}

fn messages() -> Vec<Message> {
    vec![
        Message::system("explain the feature"),
        Message::user("Example 1: The<<cat>>sat"),
    ]
}

#[tokio::test]
async fn test_generate_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "temperature": 0.0,
            "messages": [
                {"role": "system", "content": "explain the feature"},
                {"role": "user", "content": "Example 1: The<<cat>>sat"}
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("[EXPLANATION]: cats")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 0);
    let params = GenerationParams {
        temperature: Some(0.0),
        ..Default::default()
    };
    let generation = client
        .generate(&messages(), &params)
        .await
        .expect("generate failed");

    assert_eq!(generation.text, "[EXPLANATION]: cats");
    assert_eq!(generation.provider, "openai");
    assert_eq!(generation.model, "test-model-2024");
    assert_eq!(generation.meta["retries"], json!(0));
    assert_eq!(generation.meta["usage"]["input_tokens"], json!(120));
    assert_eq!(generation.meta["usage"]["output_tokens"], json!(8));
}

#[tokio::test]
async fn test_retry_on_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("[EXPLANATION]: ok")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 3);
    let generation = client
        .generate(&messages(), &GenerationParams::default())
        .await
        .expect("generate should succeed after retries");

    assert_eq!(generation.text, "[EXPLANATION]: ok");
    assert_eq!(generation.meta["retries"], json!(2));
}

#[tokio::test]
async fn test_rate_limit_exhausts_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 2);
    let err = client
        .generate(&messages(), &GenerationParams::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("429"), "unexpected error: {err}");
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 3);
    let err = client
        .generate(&messages(), &GenerationParams::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("bad request"));
}

#[tokio::test]
async fn test_missing_content_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 0);
    let err = client
        .generate(&messages(), &GenerationParams::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("missing content"));
}

#[tokio::test]
async fn test_invalid_json_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 3);
    let err = client
        .generate(&messages(), &GenerationParams::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("invalid JSON"));
}
