//! Streaming capture adapter
//!
//! Wraps a provider chunk stream so the consumer sees the exact original
//! sequence while every chunk is also buffered for capture. When the stream
//! terminates (drained, failed mid-stream, or dropped before exhaustion) the
//! completion callback fires exactly once with the buffered chunks.
//!
//! The terminal states are modeled explicitly:
//!
//! ```text
//! Streaming ──(inner returns None)──────▶ Drained
//! Streaming ──(inner yields Err / drop)─▶ Failed
//! ```
//!
//! A callback is never invoked with an empty buffer: a call that errored
//! before producing any chunk leaves nothing worth persisting.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::Stream;
use serde_json::Value;

use crate::core::RecallResult;

/// Completion callback receiving the buffered chunks
pub type ChunkCallback = Box<dyn FnOnce(Vec<Value>) + Send>;

/// Terminal-state tracking for the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamPhase {
    Streaming,
    Drained,
    Failed,
}

/// Async chunk stream adapter.
///
/// Implements `Stream` with the same item type as the inner stream; each
/// chunk is appended to the buffer and yielded unchanged. After a terminal
/// transition the stream is fused (returns `None`).
pub struct CaptureStream<S> {
    inner: S,
    buffer: Vec<Value>,
    phase: StreamPhase,
    on_complete: Option<ChunkCallback>,
}

impl<S> CaptureStream<S> {
    /// Wrap a chunk stream with a completion callback
    pub fn new(inner: S, on_complete: ChunkCallback) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            phase: StreamPhase::Streaming,
            on_complete: Some(on_complete),
        }
    }

    fn finish(&mut self, phase: StreamPhase) {
        self.phase = phase;
        if let Some(callback) = self.on_complete.take() {
            if !self.buffer.is_empty() {
                callback(std::mem::take(&mut self.buffer));
            }
        }
    }
}

impl<S> Stream for CaptureStream<S>
where
    S: Stream<Item = RecallResult<Value>> + Unpin,
{
    type Item = RecallResult<Value>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.phase != StreamPhase::Streaming {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(chunk))) => {
                this.buffer.push(chunk.clone());
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => {
                this.finish(StreamPhase::Failed);
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.finish(StreamPhase::Drained);
                Poll::Ready(None)
            }
        }
    }
}

impl<S> Drop for CaptureStream<S> {
    fn drop(&mut self) {
        // Dropped before exhaustion: caller cancelled. Persist what we have.
        if self.phase == StreamPhase::Streaming {
            self.finish(StreamPhase::Failed);
        }
    }
}

/// Blocking chunk iterator adapter, same state machine as [`CaptureStream`].
pub struct CaptureIter<I> {
    inner: I,
    buffer: Vec<Value>,
    phase: StreamPhase,
    on_complete: Option<ChunkCallback>,
}

impl<I> CaptureIter<I> {
    /// Wrap a chunk iterator with a completion callback
    pub fn new(inner: I, on_complete: ChunkCallback) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            phase: StreamPhase::Streaming,
            on_complete: Some(on_complete),
        }
    }

    fn finish(&mut self, phase: StreamPhase) {
        self.phase = phase;
        if let Some(callback) = self.on_complete.take() {
            if !self.buffer.is_empty() {
                callback(std::mem::take(&mut self.buffer));
            }
        }
    }
}

impl<I> Iterator for CaptureIter<I>
where
    I: Iterator<Item = RecallResult<Value>>,
{
    type Item = RecallResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.phase != StreamPhase::Streaming {
            return None;
        }

        match self.inner.next() {
            Some(Ok(chunk)) => {
                self.buffer.push(chunk.clone());
                Some(Ok(chunk))
            }
            Some(Err(err)) => {
                self.finish(StreamPhase::Failed);
                Some(Err(err))
            }
            None => {
                self.finish(StreamPhase::Drained);
                None
            }
        }
    }
}

impl<I> Drop for CaptureIter<I> {
    fn drop(&mut self) {
        if self.phase == StreamPhase::Streaming {
            self.finish(StreamPhase::Failed);
        }
    }
}
