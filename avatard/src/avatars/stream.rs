//! Scoped byte streams
//!
//! A `ByteStream` wraps the lazy content of a stored object. Whoever holds it
//! owns the underlying handle, which is released exactly once:
//! - `Release::Drained` when the stream reached its end
//! - `Release::Aborted` when it was dropped early or yielded an error
//!
//! Dropping the stream is the abort path, so a response body that axum
//! discards on client disconnect stops reading from the store.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use tracing::debug;

/// How a stream handle was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Drained,
    Aborted,
}

type ReleaseHook = Box<dyn FnOnce(Release) + Send>;

/// Lazy, finite, non-restartable object content
pub struct ByteStream {
    inner: BoxStream<'static, io::Result<Bytes>>,
    finished: bool,
    on_release: Option<ReleaseHook>,
    released: bool,
}

impl ByteStream {
    /// Wrap any stream of byte chunks
    pub fn new<S>(inner: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: inner.boxed(),
            finished: false,
            on_release: None,
            released: false,
        }
    }

    /// Stream a buffer that is already in memory
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        if data.is_empty() {
            return Self::new(stream::empty());
        }
        Self::new(stream::iter([Ok(data)]))
    }

    /// Register a callback invoked once when the handle is released
    pub fn on_release(mut self, hook: impl FnOnce(Release) + Send + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    /// Abort the stream without reading the rest of it
    pub fn abort(self) {
        drop(self);
    }

    fn release(&mut self, how: Release) {
        if self.released {
            return;
        }
        self.released = true;
        debug!(release = ?how, "byte stream released");
        if let Some(hook) = self.on_release.take() {
            hook(how);
        }
    }
}

impl Stream for ByteStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match self.inner.poll_next_unpin(cx) {
            Poll::Ready(None) => {
                self.finished = true;
                self.release(Release::Drained);
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                self.finished = true;
                self.release(Release::Aborted);
                Poll::Ready(Some(Err(e)))
            }
            other => other,
        }
    }
}

impl Drop for ByteStream {
    fn drop(&mut self) {
        self.release(Release::Aborted);
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("finished", &self.finished)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
