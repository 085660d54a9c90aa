//! Completion tracking for response bodies.
//!
//! A [`TrackedStream`] forwards chunks from an inner body. When the inner body
//! ends cleanly it runs its completion hook before reporting end-of-stream, so
//! by the time the transport sees the end of the body the hook has finished.
//! An error chunk or an early drop (client gone) never runs the hook.
//!
//! A body sent with a `Content-Length` is dropped by the transport right after
//! its last byte, without being polled to its end. For such bodies the
//! expected length is set with [`TrackedStream::expect_len`], and the hook runs
//! as soon as that many bytes have been read, before the final chunk is
//! released.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures_util::Stream;

use super::ByteStream;
use crate::locks::NamespaceGuard;

/// How a tracked delivery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Every chunk was handed to the transport.
    Delivered,
    /// The body failed or was dropped before its end.
    Aborted,
}

type CompletionFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type CompletionHook = Box<dyn FnOnce() -> CompletionFuture + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Streaming,
    Finishing,
    Done,
    Failed,
}

/// Body wrapper that runs a hook after a complete delivery.
pub struct TrackedStream {
    inner: ByteStream,
    label: String,
    state: State,
    on_delivered: Option<CompletionHook>,
    finishing: Option<CompletionFuture>,
    expected_len: Option<u64>,
    sent: u64,
    last_chunk: Option<Bytes>,
    guard: Option<NamespaceGuard>,
}

impl TrackedStream {
    /// Wraps `inner`; `label` identifies the delivery in log lines.
    pub fn new(inner: ByteStream, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
            state: State::Streaming,
            on_delivered: None,
            finishing: None,
            expected_len: None,
            sent: 0,
            last_chunk: None,
            guard: None,
        }
    }

    /// Sets the hook run once the inner body has ended without error.
    pub fn on_delivered<F, Fut>(mut self, hook: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_delivered = Some(Box::new(move || Box::pin(hook())));
        self
    }

    /// Declares the body length advertised to the client.
    ///
    /// Reaching it counts as a complete delivery even if the inner body is
    /// never polled to its end. Zero is ignored.
    pub fn expect_len(mut self, len: Option<u64>) -> Self {
        self.expected_len = len.filter(|&len| len > 0);
        self
    }

    /// Keeps a namespace lock until the delivery has finished or been dropped.
    pub fn hold(mut self, guard: Option<NamespaceGuard>) -> Self {
        self.guard = guard;
        self
    }

    /// The outcome so far; `None` while the body is still being sent.
    pub fn outcome(&self) -> Option<DeliveryOutcome> {
        match self.state {
            State::Streaming | State::Finishing => None,
            State::Done => Some(DeliveryOutcome::Delivered),
            State::Failed => Some(DeliveryOutcome::Aborted),
        }
    }

    fn finish(&mut self) {
        self.finishing = self.on_delivered.take().map(|hook| hook());
        self.state = State::Finishing;
    }
}

impl Stream for TrackedStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            match this.state {
                State::Done | State::Failed => {
                    this.guard = None;
                    return Poll::Ready(None);
                }
                State::Finishing => {
                    if let Some(fut) = this.finishing.as_mut() {
                        ready!(fut.as_mut().poll(cx));
                    }
                    this.finishing = None;
                    this.state = State::Done;
                    if let Some(chunk) = this.last_chunk.take() {
                        return Poll::Ready(Some(Ok(chunk)));
                    }
                    this.guard = None;
                    return Poll::Ready(None);
                }
                State::Streaming => match ready!(this.inner.as_mut().poll_next(cx)) {
                    Some(Ok(chunk)) => {
                        this.sent += chunk.len() as u64;
                        if this.expected_len.is_some_and(|len| this.sent >= len) {
                            this.last_chunk = Some(chunk);
                            this.finish();
                            continue;
                        }
                        return Poll::Ready(Some(Ok(chunk)));
                    }
                    Some(Err(e)) => {
                        tracing::warn!(
                            delivery = %this.label,
                            error = %e,
                            "Delivery failed mid-stream; no use consumed"
                        );
                        this.state = State::Failed;
                        this.on_delivered = None;
                        this.guard = None;
                        return Poll::Ready(Some(Err(e)));
                    }
                    None => this.finish(),
                },
            }
        }
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        if self.state == State::Streaming {
            tracing::warn!(
                delivery = %self.label,
                "Delivery aborted before completion; no use consumed"
            );
        }
    }
}
