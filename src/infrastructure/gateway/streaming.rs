//! Server-Sent Events parsing for streamed completions.
//!
//! `streamGenerateContent?alt=sse` delivers one JSON chunk per `data:` line.
//! `SseStream` turns a raw byte stream into those payload strings, handling
//! payloads split across network reads; chunk-to-fragment mapping lives in
//! the client.

use bytes::Bytes;
use futures::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::domain::errors::GatewayError;

/// SSE framing over a byte stream: yields the payload of each `data:` line.
pub struct SseStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, GatewayError>> + Send>>,
    buffer: String,
    ready: VecDeque<String>,
    done: bool,
}

impl SseStream {
    pub fn new(
        stream: impl Stream<Item = Result<Bytes, GatewayError>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(stream),
            buffer: String::new(),
            ready: VecDeque::new(),
            done: false,
        }
    }

    /// Split complete lines off the buffer and queue their payloads.
    fn drain_lines(&mut self) {
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(payload) = line.strip_prefix("data:") {
                let payload = payload.trim_start();
                if !payload.is_empty() {
                    self.ready.push_back(payload.to_string());
                }
            }
            // Event-type and comment lines carry nothing we need.
        }
    }
}

impl Stream for SseStream {
    type Item = Result<String, GatewayError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(payload) = self.ready.pop_front() {
                return Poll::Ready(Some(Ok(payload)));
            }
            if self.done {
                return Poll::Ready(None);
            }
            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    self.buffer.push_str(&String::from_utf8_lossy(&bytes));
                    self.drain_lines();
                }
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err))),
                Poll::Ready(None) => {
                    self.done = true;
                    // A final payload without a trailing newline still counts.
                    if !self.buffer.is_empty() {
                        self.buffer.push('\n');
                        self.drain_lines();
                        self.buffer.clear();
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
