//! Proxy chat-completion calls against a mock relay.

use chatrelay::{ApiClient, ChatMessage, ChatRequest, ClientConfig, LlmError, LlmProvider};
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, max_retries: usize, base_delay_ms: u64) -> ApiClient {
    let cfg = ClientConfig::new(server.uri())
        .with_retries(max_retries, Duration::from_millis(base_delay_ms));
    ApiClient::with_http_client(&cfg, reqwest::Client::builder().no_proxy().build().unwrap())
}

fn chat_request() -> ChatRequest {
    ChatRequest::new(
        "https://api.example.com/v1/chat/completions",
        "sk-test",
        "gpt-4o-mini",
        vec![ChatMessage::system("be brief"), ChatMessage::user("hi")],
    )
}

fn completion() -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "hello!"}}],
        "usage": {"prompt_tokens": 3, "completion_tokens": 2}
    })
}

#[tokio::test]
async fn success_returns_body_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/proxy"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "apiUrl": "https://api.example.com/v1/chat/completions",
            "apiKey": "sk-test",
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hi"}
            ],
            "temperature": 0.3
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3, 10);
    let req = chat_request().with_option("temperature", json!(0.3));
    let out = client.call_openai_api(&req).await.expect("proxy ok");
    assert_eq!(out, completion());
}

#[tokio::test]
async fn server_errors_retry_max_times_then_surface_last_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/proxy"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": {"message": "upstream exploded"}})),
        )
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server, 3, 10);
    let err = client.call_openai_api(&chat_request()).await.unwrap_err();
    match err {
        LlmError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn backoff_doubles_between_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server, 3, 60);
    let started = Instant::now();
    let _ = client.call_openai_api(&chat_request()).await.unwrap_err();
    // 60ms + 120ms, no sleep after the final attempt
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(180), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(420), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn gateway_timeout_has_its_own_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(504).set_body_string("gateway timeout"))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, 2, 5);
    let err = client.call_openai_api(&chat_request()).await.unwrap_err();
    assert!(matches!(err, LlmError::GatewayTimeout), "{err:?}");
}

#[tokio::test]
async fn unparseable_error_body_falls_back_to_status_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server, 1, 5);
    let err = client.call_openai_api(&chat_request()).await.unwrap_err();
    match err {
        LlmError::Api { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "Bad Gateway");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn timeout_fails_immediately_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion())
                .set_delay(Duration::from_millis(800)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3, 10);
    let req = chat_request().with_timeout(Duration::from_millis(100));
    let started = Instant::now();
    let err = client.call_openai_api(&req).await.unwrap_err();
    let elapsed = started.elapsed();
    assert!(elapsed < Duration::from_millis(400), "elapsed {elapsed:?}");
    assert!(matches!(err, LlmError::Timeout(d) if d == Duration::from_millis(100)), "{err:?}");
}

#[tokio::test]
async fn recovers_after_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3, 10);
    let out = client.call_openai_api(&chat_request()).await.expect("second try ok");
    assert_eq!(out["id"], "chatcmpl-1");
}

#[tokio::test]
async fn malformed_json_is_reported_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, 2, 5);
    let err = client.call_openai_api(&chat_request()).await.unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse(_)), "{err:?}");
}

#[tokio::test]
async fn provider_chat_extracts_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/proxy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion()))
        .mount(&server)
        .await;

    let client = client_for(&server, 1, 5);
    let resp = client.chat(chat_request()).await.expect("chat ok");
    assert_eq!(resp.text, "hello!");
    assert_eq!(resp.raw, completion());
}

#[tokio::test]
async fn connection_refused_is_retried_with_backoff() {
    // nothing listens on port 1
    let cfg = ClientConfig::new("http://127.0.0.1:1").with_retries(3, Duration::from_millis(50));
    let client =
        ApiClient::with_http_client(&cfg, reqwest::Client::builder().no_proxy().build().unwrap());

    let started = Instant::now();
    let err = client.call_openai_api(&chat_request()).await.unwrap_err();
    let elapsed = started.elapsed();
    assert!(matches!(err, LlmError::Http(_)), "{err:?}");
    // 50ms + 100ms
    assert!(elapsed >= Duration::from_millis(150), "elapsed {elapsed:?}");
}
