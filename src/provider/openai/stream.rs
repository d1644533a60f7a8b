use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::error::LLMError;
use crate::http::HttpBodyStream;
use crate::provider::ResponseStream;
use crate::stream::{SseDecoder, SseEvent};

use super::types::ChatCompletionsStreamingEvent;

/// 把 SSE delta 事件流聚合成逐步增长的完整文本快照流
pub(crate) fn partial_response_stream(body: HttpBodyStream) -> ResponseStream {
    Box::pin(PartialResponseStream {
        decoder: SseDecoder::new(body),
        accumulated: String::new(),
        finished: false,
    })
}

/// Aggregates delta fragments into cumulative snapshots.
///
/// Owns the SSE decoder and, through it, the live connection; dropping the
/// stream on any exit path releases the connection. Terminal states (source
/// exhausted, `[DONE]`, first error) are sticky.
struct PartialResponseStream {
    decoder: SseDecoder,
    accumulated: String,
    finished: bool,
}

impl PartialResponseStream {
    /// Extracts the delta fragment from one event payload.
    ///
    /// Returns `Ok(None)` for heartbeat events whose delta carries no
    /// content; an event with zero choices is a schema mismatch.
    fn parse_fragment(data: &str) -> Result<Option<String>, LLMError> {
        let event: ChatCompletionsStreamingEvent = serde_json::from_str(data)
            .map_err(|err| LLMError::validation(format!("failed to parse stream event: {err}")))?;
        let Some(choice) = event.choices.first() else {
            return Err(LLMError::validation("streaming event carries no choices"));
        };
        Ok(choice
            .delta
            .content
            .clone()
            .filter(|fragment| !fragment.is_empty()))
    }
}

impl Stream for PartialResponseStream {
    type Item = Result<String, LLMError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.finished {
            return Poll::Ready(None);
        }

        loop {
            match Pin::new(&mut this.decoder).poll_next(cx) {
                Poll::Ready(Some(Ok(SseEvent::Done))) | Poll::Ready(None) => {
                    this.finished = true;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Ok(SseEvent::Data(data)))) => {
                    match Self::parse_fragment(&data) {
                        Ok(Some(fragment)) => {
                            this.accumulated.push_str(&fragment);
                            return Poll::Ready(Some(Ok(this.accumulated.clone())));
                        }
                        // role-only delta or heartbeat, nothing to yield
                        Ok(None) => continue,
                        Err(err) => {
                            this.finished = true;
                            return Poll::Ready(Some(Err(err)));
                        }
                    }
                }
                Poll::Ready(Some(Err(err))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
