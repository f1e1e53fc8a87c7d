//! Future-based wrapper around a spawned crawl session.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::crawl_engine::{CrawlError, CrawlReport, CrawlResult};

/// A pending crawl session.
/// This wraps a oneshot receiver and implements Future so it can be awaited.
pub struct CrawlRequest {
    receiver: oneshot::Receiver<CrawlResult<CrawlReport>>,
}

impl CrawlRequest {
    /// Create a new `CrawlRequest` from a oneshot receiver
    #[must_use]
    pub fn new(receiver: oneshot::Receiver<CrawlResult<CrawlReport>>) -> Self {
        Self { receiver }
    }
}

/// Implement Future so users can simply .await the `CrawlRequest`
impl Future for CrawlRequest {
    type Output = CrawlResult<CrawlReport>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // Sender dropped: the session task was aborted or panicked
            Poll::Ready(Err(_)) => Poll::Ready(Err(CrawlError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}
