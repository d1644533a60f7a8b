use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use musubi::http::{HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport};
use musubi::{LLMError, LLMProvider, Message, OpenAiConfig, OpenAiProvider, RetryPolicy};

/// Transport double with connection-pool accounting: every streaming body
/// holds a guard that decrements the active-connection counter on drop.
struct CountingTransport {
    active_connections: Arc<AtomicUsize>,
    chunks: Vec<Result<Vec<u8>, String>>,
}

struct ConnectionGuard {
    active_connections: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl HttpTransport for CountingTransport {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, LLMError> {
        panic!("buffered send is not used in this test");
    }

    async fn send_stream(&self, _request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
        self.active_connections.fetch_add(1, Ordering::SeqCst);
        let guard = ConnectionGuard {
            active_connections: self.active_connections.clone(),
        };
        let chunks = self.chunks.clone();
        let body = stream::unfold(
            (chunks.into_iter(), guard),
            |(mut chunks, guard)| async move {
                chunks.next().map(|chunk| {
                    let item = chunk.map_err(LLMError::transport);
                    (item, (chunks, guard))
                })
            },
        );
        Ok(HttpStreamResponse {
            status: 200,
            body: Box::pin(body),
        })
    }
}

fn provider(transport: Arc<CountingTransport>) -> OpenAiProvider {
    let config = OpenAiConfig {
        url: "http://example.test/v1/chat/completions".to_string(),
        auth_token: None,
        model_name: "gpt-test".to_string(),
        force_user_assistant_message_alternation: false,
        temperature: 0.2,
        request_extra: HashMap::new(),
    };
    let retry = RetryPolicy::default()
        .with_max_attempts(1)
        .with_wait_initial(Duration::from_millis(1))
        .with_wait_jitter(Duration::ZERO);
    OpenAiProvider::new(config, transport).with_retry_policy(retry)
}

fn sse_chunk(event: &str) -> Result<Vec<u8>, String> {
    Ok(format!("data: {event}\n\n").into_bytes())
}

#[tokio::test]
async fn abandoning_a_stream_releases_the_connection() {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let transport = Arc::new(CountingTransport {
        active_connections: active_connections.clone(),
        chunks: vec![
            sse_chunk(r#"{"choices":[{"delta":{"content":"H"}}]}"#),
            sse_chunk(r#"{"choices":[{"delta":{"content":"i"}}]}"#),
            sse_chunk("[DONE]"),
        ],
    });

    let mut stream = provider(transport)
        .stream_response(vec![Message::user("Hi there")], None)
        .await
        .expect("stream starts");

    let first = stream.next().await.expect("first element").expect("ok");
    assert_eq!(first, "H");
    assert_eq!(active_connections.load(Ordering::SeqCst), 1);

    // consumer walks away after the first element
    drop(stream);
    assert_eq!(active_connections.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn completed_stream_releases_the_connection() {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let transport = Arc::new(CountingTransport {
        active_connections: active_connections.clone(),
        chunks: vec![
            sse_chunk(r#"{"choices":[{"delta":{"content":"done"}}]}"#),
            sse_chunk("[DONE]"),
        ],
    });

    let stream = provider(transport)
        .stream_response(vec![Message::user("Hi there")], None)
        .await
        .expect("stream starts");
    let snapshots: Vec<String> = stream.map(|item| item.expect("snapshot")).collect().await;

    assert_eq!(snapshots, vec!["done"]);
    assert_eq!(active_connections.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn partial_output_before_a_failure_is_observed_then_error_surfaces() {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let transport = Arc::new(CountingTransport {
        active_connections: active_connections.clone(),
        chunks: vec![
            sse_chunk(r#"{"choices":[{"delta":{"content":"partial"}}]}"#),
            Err("connection reset mid-stream".to_string()),
        ],
    });

    let mut stream = provider(transport)
        .stream_response(vec![Message::user("Hi there")], None)
        .await
        .expect("stream starts");

    let first = stream.next().await.expect("first element").expect("ok");
    assert_eq!(first, "partial");

    let err = stream.next().await.expect("error element").unwrap_err();
    assert!(matches!(err, LLMError::Transport { .. }));

    drop(stream);
    assert_eq!(active_connections.load(Ordering::SeqCst), 0);
}
