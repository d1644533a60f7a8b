use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use musubi::http::{
    DynHttpTransport, HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport,
};
use musubi::{LLMError, LLMProvider, Message, OpenAiConfig, OpenAiProvider, RetryPolicy};

/// Transport double that always replies with one canned response and records
/// every request it saw.
struct StaticTransport {
    status: u16,
    body: Vec<u8>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StaticTransport {
    fn new(status: u16, body: impl Into<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.into(),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn last_request(&self) -> HttpRequest {
        self.requests
            .lock()
            .expect("lock")
            .last()
            .cloned()
            .expect("at least one request was sent")
    }

    fn request_count(&self) -> usize {
        self.requests.lock().expect("lock").len()
    }
}

#[async_trait]
impl HttpTransport for StaticTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        self.requests.lock().expect("lock").push(request);
        Ok(HttpResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
        self.requests.lock().expect("lock").push(request);
        let body = self.body.clone();
        Ok(HttpStreamResponse {
            status: self.status,
            body: Box::pin(stream::once(async move { Ok(body) })),
        })
    }
}

fn config() -> OpenAiConfig {
    OpenAiConfig {
        url: "http://example.test/v1/chat/completions".to_string(),
        auth_token: None,
        model_name: "gpt-test".to_string(),
        force_user_assistant_message_alternation: false,
        temperature: 0.2,
        request_extra: HashMap::new(),
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(2)
        .with_wait_initial(Duration::from_millis(1))
        .with_wait_max(Duration::from_millis(2))
        .with_wait_jitter(Duration::ZERO)
}

fn provider(config: OpenAiConfig, transport: DynHttpTransport) -> OpenAiProvider {
    OpenAiProvider::new(config, transport).with_retry_policy(fast_retry())
}

fn sse_body(events: &[&str]) -> Vec<u8> {
    let mut raw = String::new();
    for event in events {
        raw.push_str("data: ");
        raw.push_str(event);
        raw.push_str("\n\n");
    }
    raw.into_bytes()
}

#[tokio::test]
async fn request_response_returns_first_choice_content() {
    let transport = StaticTransport::new(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":"expected result"}}]}"#,
    );
    let provider = provider(config(), transport.clone());

    let result = provider
        .request_response(vec![Message::user("Hi there")], None)
        .await
        .expect("request should succeed");

    assert_eq!(result, "expected result");
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn request_response_fails_without_choices() {
    let transport = StaticTransport::new(200, r#"{"choices":[]}"#);
    let provider = provider(config(), transport);

    let err = provider
        .request_response(vec![Message::user("Hi there")], None)
        .await
        .expect_err("zero choices is a schema mismatch");

    match err {
        LLMError::Validation { message } => {
            assert!(message.contains("choices"), "unexpected message: {message}");
        }
        other => panic!("unexpected error type: {other:?}"),
    }
}

#[tokio::test]
async fn request_payload_carries_auth_model_and_temperature() {
    let transport = StaticTransport::new(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#,
    );
    let mut config = config();
    config.auth_token = Some("secret-token".to_string());
    let provider = provider(config, transport.clone());

    provider
        .request_response(vec![Message::user("Hi there")], Some(0.7))
        .await
        .expect("request should succeed");

    let request = transport.last_request();
    assert_eq!(
        request.headers.get("Authorization"),
        Some(&"Bearer secret-token".to_string())
    );

    let payload: serde_json::Value =
        serde_json::from_slice(&request.body.expect("payload body")).expect("json payload");
    assert_eq!(payload["stream"], serde_json::json!(false));
    assert_eq!(payload["model"], serde_json::json!("gpt-test"));
    assert_eq!(payload["temperature"], serde_json::json!(0.7));
    assert_eq!(payload["messages"][0]["content"], serde_json::json!("Hi there"));
}

#[tokio::test]
async fn auth_header_is_omitted_without_token() {
    let transport = StaticTransport::new(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#,
    );
    let provider = provider(config(), transport.clone());

    provider
        .request_response(vec![Message::user("Hi there")], None)
        .await
        .expect("request should succeed");

    assert!(
        transport
            .last_request()
            .headers
            .get("Authorization")
            .is_none()
    );
}

#[tokio::test]
async fn unresolved_temperature_falls_back_to_config_value() {
    let transport = StaticTransport::new(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#,
    );
    let mut config = config();
    config.temperature = 0.5;
    let provider = provider(config, transport.clone());

    provider
        .request_response(vec![Message::user("Hi there")], None)
        .await
        .expect("request should succeed");

    let payload: serde_json::Value =
        serde_json::from_slice(&transport.last_request().body.expect("payload body"))
            .expect("json payload");
    assert_eq!(payload["temperature"], serde_json::json!(0.5));
}

#[tokio::test]
async fn alternation_flag_rewrites_the_outgoing_message_list() {
    let transport = StaticTransport::new(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#,
    );
    let mut config = config();
    config.force_user_assistant_message_alternation = true;
    let provider = provider(config, transport.clone());

    provider
        .request_response(
            vec![Message::system("Be nice"), Message::user("Hi there")],
            None,
        )
        .await
        .expect("request should succeed");

    let payload: serde_json::Value =
        serde_json::from_slice(&transport.last_request().body.expect("payload body"))
            .expect("json payload");
    assert_eq!(
        payload["messages"],
        serde_json::json!([{"role": "user", "content": "Be nice\n\nHi there"}])
    );
}

#[tokio::test]
async fn stream_response_yields_growing_snapshots() {
    let body = sse_body(&[
        r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
        r#"{"choices":[{"delta":{"content":"H"}}]}"#,
        r#"{"choices":[{"delta":{"content":"i"}}]}"#,
        r#"{"choices":[{"delta":{"content":" t"}}]}"#,
        r#"{"choices":[{"delta":{"role":"assistant","content":"here"}}]}"#,
        r#"{"choices":[{"delta":{}}]}"#,
        r#"{"choices":[{"delta":{"content":". How is you"}}]}"#,
        r#"{"choices":[{"delta":{"content":"r day?"}}]}"#,
        r#"{"choices":[{"delta":{}}]}"#,
        "[DONE]",
    ]);
    let transport = StaticTransport::new(200, body);
    let provider = provider(config(), transport);

    let snapshots: Vec<String> = provider
        .stream_response(vec![Message::user("Hi there")], None)
        .await
        .expect("stream starts")
        .map(|item| item.expect("snapshot"))
        .collect()
        .await;

    assert_eq!(
        snapshots,
        vec![
            "H",
            "Hi",
            "Hi t",
            "Hi there",
            "Hi there. How is you",
            "Hi there. How is your day?",
        ]
    );
}

#[tokio::test]
async fn stream_event_without_choices_fails_validation() {
    let transport = StaticTransport::new(200, sse_body(&[r#"{"choices":[]}"#]));
    let provider = provider(config(), transport);

    let items: Vec<Result<String, LLMError>> = provider
        .stream_response(vec![Message::user("Hi there")], None)
        .await
        .expect("stream starts")
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(LLMError::Validation { .. })));
}

const OUT_OF_TOKENS_BODY: &str = r#"{"object":"error","message":"This model's maximum context length is 4096 tokens. However, you requested 5253 tokens in the messages, Please reduce the length of the messages.","type":"BadRequestError","param":null,"code":400}"#;

#[tokio::test]
async fn too_long_prompt_maps_to_out_of_tokens_error() {
    for streaming in [false, true] {
        let transport = StaticTransport::new(400, OUT_OF_TOKENS_BODY);
        let provider = provider(config(), transport.clone());

        let err = if streaming {
            provider
                .stream_response(vec![Message::user("Hi there")], None)
                .await
                .map(|_| ())
                .expect_err("stream establishment fails")
        } else {
            provider
                .request_response(vec![Message::user("Hi there")], None)
                .await
                .map(|_| ())
                .expect_err("request fails")
        };

        match err {
            LLMError::OutOfTokensOrSymbols { body } => {
                assert_eq!(body, OUT_OF_TOKENS_BODY.as_bytes());
            }
            other => panic!("unexpected error type (streaming={streaming}): {other:?}"),
        }
        // the 400 is retried before classification kicks in
        assert_eq!(transport.request_count(), 2);
    }
}

#[tokio::test]
async fn unrelated_errors_map_to_generic_response_error() {
    for status in [400u16, 500] {
        for streaming in [false, true] {
            let transport = StaticTransport::new(status, "something else went wrong");
            let provider = provider(config(), transport);

            let err = if streaming {
                provider
                    .stream_response(vec![Message::user("Hi there")], None)
                    .await
                    .map(|_| ())
                    .expect_err("stream establishment fails")
            } else {
                provider
                    .request_response(vec![Message::user("Hi there")], None)
                    .await
                    .map(|_| ())
                    .expect_err("request fails")
            };

            match err {
                LLMError::Response { body } => {
                    assert_eq!(body, b"something else went wrong");
                }
                other => {
                    panic!("unexpected error type (status={status}, streaming={streaming}): {other:?}")
                }
            }
        }
    }
}
