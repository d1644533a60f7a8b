use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::error::LLMError;
use crate::http::HttpBodyStream;
use crate::provider::ResponseStream;
use crate::stream::LineDecoder;

use super::types::CompletionResponse;

/// 把逐行全文响应流映射成文本快照流
///
/// 该协议每行都携带截至当前的完整文本 无需本地累积 直接透传
pub(crate) fn partial_response_stream(body: HttpBodyStream) -> ResponseStream {
    Box::pin(PartialResponseStream {
        decoder: LineDecoder::new(body),
        finished: false,
    })
}

struct PartialResponseStream {
    decoder: LineDecoder,
    finished: bool,
}

/// Parses one streamed line into the cumulative text it carries.
fn parse_line(line: &str) -> Result<String, LLMError> {
    let parsed: CompletionResponse = serde_json::from_str(line)
        .map_err(|err| LLMError::validation(format!("failed to parse stream line: {err}")))?;
    let Some(alternative) = parsed.result.alternatives.first() else {
        return Err(LLMError::validation("response carries no alternatives"));
    };
    Ok(alternative.message.text.clone())
}

impl Stream for PartialResponseStream {
    type Item = Result<String, LLMError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.finished {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.decoder).poll_next(cx) {
            Poll::Ready(Some(Ok(line))) => match parse_line(&line) {
                Ok(text) => Poll::Ready(Some(Ok(text))),
                Err(err) => {
                    this.finished = true;
                    Poll::Ready(Some(Err(err)))
                }
            },
            Poll::Ready(Some(Err(err))) => {
                this.finished = true;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
