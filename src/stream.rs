//! Lazy sequence of decoded events over a live response body.

use crate::error::Error;
use crate::sse::{decode_line, LineDecoder};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Sleep;

/// Response body as delivered by reqwest.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Stream returned by [`Client::stream_query`](crate::Client::stream_query).
pub type ResponseStream = QueryStream<ByteStream>;

pin_project! {
    /// A streaming query response.
    ///
    /// Yields one JSON value per decodable line. Lines that are blank or not JSON
    /// are skipped. A transport failure after the stream started is yielded once as
    /// an error, after which the stream ends. Dropping the stream closes the
    /// connection.
    pub struct QueryStream<S> {
        #[pin]
        inner: S,
        lines: LineDecoder,
        idle_timeout: Option<Duration>,
        idle: Option<Pin<Box<Sleep>>>,
        yielded: usize,
        done: bool,
    }
}

impl<S> QueryStream<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>>,
{
    /// Create a new stream over a response body.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            lines: LineDecoder::new(),
            idle_timeout: None,
            idle: None,
            yielded: 0,
            done: false,
        }
    }

    /// End the stream with [`Error::StreamTimeout`] if no bytes arrive for `timeout`.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Number of values yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Check if stream is done.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl<S> fmt::Debug for QueryStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryStream")
            .field("buffered", &self.lines.buffer_len())
            .field("idle_timeout", &self.idle_timeout)
            .field("yielded", &self.yielded)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<S> QueryStream<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    /// Get the next decoded value from the stream.
    pub async fn next(&mut self) -> Option<Result<Value, Error>> {
        futures::StreamExt::next(self).await
    }
}

impl<S> Stream for QueryStream<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>>,
{
    type Item = Result<Value, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.done {
            return Poll::Ready(None);
        }

        loop {
            // Drain buffered lines first
            while let Some(line) = this.lines.next_line() {
                if let Some(value) = decode_line(line) {
                    *this.yielded += 1;
                    return Poll::Ready(Some(Ok(value)));
                }
                tracing::trace!(len = line.len(), "skipping undecodable stream line");
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.lines.feed(&bytes);
                    *this.idle = None;
                }
                Poll::Ready(Some(Err(e))) => {
                    *this.done = true;
                    tracing::warn!(error = %e, yielded = *this.yielded, "stream interrupted");
                    return Poll::Ready(Some(Err(Error::Stream(e))));
                }
                Poll::Ready(None) => {
                    *this.done = true;
                    // Body ended without a trailing newline
                    if let Some(value) = this.lines.finish().and_then(decode_line) {
                        *this.yielded += 1;
                        return Poll::Ready(Some(Ok(value)));
                    }
                    tracing::debug!(yielded = *this.yielded, "stream finished");
                    return Poll::Ready(None);
                }
                Poll::Pending => {
                    if let Some(timeout) = *this.idle_timeout {
                        let idle = this
                            .idle
                            .get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
                        if idle.as_mut().poll(cx).is_ready() {
                            *this.done = true;
                            tracing::warn!(?timeout, "stream idle timeout");
                            return Poll::Ready(Some(Err(Error::StreamTimeout(timeout))));
                        }
                    }
                    return Poll::Pending;
                }
            }
        }
    }
}
