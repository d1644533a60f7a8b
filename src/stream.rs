//! Wire-format decoders turning raw HTTP body streams into discrete events.
//!
//! Two shapes are supported: Server-Sent Events (`data:` payloads terminated
//! by a literal `[DONE]`) and newline-delimited JSON documents. Both decoders
//! are single-pass and finite; provider modules layer their own JSON parsing
//! and accumulation semantics on top.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::error::LLMError;
use crate::http::HttpBodyStream;

/// Standardized SSE event yielded by [`SseDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Raw `data:` payload emitted by the provider.
    Data(String),
    /// Terminal marker reported via `[DONE]`.
    Done,
}

/// Splits one complete line off the front of `buffer`, tolerating CRLF.
fn drain_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let pos = buffer.iter().position(|b| *b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=pos).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(line)
}

fn decode_utf8(bytes: Vec<u8>) -> Result<String, LLMError> {
    String::from_utf8(bytes)
        .map_err(|err| LLMError::validation(format!("invalid UTF-8 in stream chunk: {err}")))
}

/// Normalizes a provider SSE feed into [`SseEvent`] values.
///
/// Multi-line `data:` segments belonging to one event are joined with a
/// newline; lines that carry no `data:` prefix (comments, `event:` fields)
/// are ignored. Once `[DONE]` is seen the decoder reports end of stream and
/// ignores anything the provider sends afterwards.
pub struct SseDecoder {
    body: HttpBodyStream,
    buffer: Vec<u8>,
    data_lines: Vec<Vec<u8>>,
    pending: VecDeque<Result<SseEvent, LLMError>>,
    stream_closed: bool,
    done_received: bool,
}

impl SseDecoder {
    /// Wraps a raw HTTP body stream and prepares it for SSE decoding.
    pub fn new(body: HttpBodyStream) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            data_lines: Vec::new(),
            pending: VecDeque::new(),
            stream_closed: false,
            done_received: false,
        }
    }

    fn handle_line(&mut self, line: Vec<u8>) {
        if line.starts_with(b"data:") {
            let mut data = line[5..].to_vec();
            if data.first() == Some(&b' ') {
                data.remove(0);
            }
            self.data_lines.push(data);
        }
    }

    fn flush_event(&mut self) {
        if self.done_received {
            self.data_lines.clear();
            return;
        }
        if self.data_lines.is_empty() {
            return;
        }

        let mut joined = Vec::new();
        for (idx, mut segment) in self.data_lines.drain(..).enumerate() {
            if idx > 0 {
                joined.push(b'\n');
            }
            joined.append(&mut segment);
        }

        if joined.is_empty() {
            return;
        }

        match decode_utf8(joined) {
            Ok(data) => {
                if data.trim() == "[DONE]" {
                    if !self.done_received {
                        self.done_received = true;
                        self.pending.push_back(Ok(SseEvent::Done));
                    }
                } else {
                    self.pending.push_back(Ok(SseEvent::Data(data)));
                }
            }
            Err(err) => self.pending.push_back(Err(err)),
        }
    }
}

impl Stream for SseDecoder {
    type Item = Result<SseEvent, LLMError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(event));
            }

            if this.done_received {
                return Poll::Ready(None);
            }

            // complete lines may be left over from a previous poll
            while let Some(line) = drain_line(&mut this.buffer) {
                if line.is_empty() {
                    this.flush_event();
                } else {
                    this.handle_line(line);
                }
            }
            if !this.pending.is_empty() {
                continue;
            }

            if this.stream_closed {
                // residual bytes form one final, unterminated line
                if !this.buffer.is_empty() {
                    let line = std::mem::take(&mut this.buffer);
                    this.handle_line(line);
                }
                this.flush_event();
                return this
                    .pending
                    .pop_front()
                    .map_or(Poll::Ready(None), |event| Poll::Ready(Some(event)));
            }

            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err))),
                Poll::Ready(None) => this.stream_closed = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Yields each complete, non-blank line of a raw HTTP body stream.
///
/// Used for providers that send one full JSON document per line. A trailing
/// line without a final newline is flushed when the source stream ends.
pub struct LineDecoder {
    body: HttpBodyStream,
    buffer: Vec<u8>,
    pending: VecDeque<Result<String, LLMError>>,
    stream_closed: bool,
}

impl LineDecoder {
    /// Wraps a raw HTTP body stream and prepares it for line splitting.
    pub fn new(body: HttpBodyStream) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            pending: VecDeque::new(),
            stream_closed: false,
        }
    }

    fn push_line(&mut self, line: Vec<u8>) {
        if line.is_empty() {
            return;
        }
        match decode_utf8(line) {
            Ok(text) => {
                if !text.trim().is_empty() {
                    self.pending.push_back(Ok(text));
                }
            }
            Err(err) => self.pending.push_back(Err(err)),
        }
    }
}

impl Stream for LineDecoder {
    type Item = Result<String, LLMError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(line) = this.pending.pop_front() {
                return Poll::Ready(Some(line));
            }

            if this.stream_closed {
                if this.buffer.is_empty() {
                    return Poll::Ready(None);
                }
                let line = std::mem::take(&mut this.buffer);
                this.push_line(line);
                continue;
            }

            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(chunk_result)) => match chunk_result {
                    Ok(bytes) => {
                        this.buffer.extend_from_slice(&bytes);
                        while let Some(line) = drain_line(&mut this.buffer) {
                            this.push_line(line);
                        }
                    }
                    Err(err) => return Poll::Ready(Some(Err(err))),
                },
                Poll::Ready(None) => {
                    this.stream_closed = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
