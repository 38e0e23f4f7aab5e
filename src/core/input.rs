//! Byte stream input for session channel scans.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, ReadBuf};

/// Type-erased readable stream handed to a channel.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

pin_project! {
    /// Reader wrapper that counts the bytes pulled through it.
    ///
    /// The counter is shared, so the size of a stream is still known after
    /// the reader itself has been moved into a channel and dropped.
    pub struct CountingReader<R> {
        #[pin]
        inner: R,
        count: Arc<AtomicU64>,
    }
}

impl<R> CountingReader<R> {
    /// Wraps `inner`, returning the reader and its byte counter.
    pub fn new(inner: R) -> (Self, Arc<AtomicU64>) {
        let count = Arc::new(AtomicU64::new(0));
        (
            Self {
                inner,
                count: Arc::clone(&count),
            },
            count,
        )
    }
}

impl<R: AsyncRead> AsyncRead for CountingReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.project();
        let before = buf.filled().len();
        let poll = this.inner.poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let read = (buf.filled().len() - before) as u64;
            this.count.fetch_add(read, Ordering::Relaxed);
        }
        poll
    }
}
