use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::TerminationCause;

/// A handle to a single in-flight request, resolved exactly once by
/// `complete`, `cancel`, `cancelAll`, a duplicate-STAN registration, or the
/// scheduled timeout (§4.3 "exactly one terminal outcome per STAN").
pub struct Waiter<T> {
    rx: oneshot::Receiver<Result<T, TerminationCause>>,
}

impl<T> Waiter<T> {
    pub(crate) fn new(rx: oneshot::Receiver<Result<T, TerminationCause>>) -> Self {
        Waiter { rx }
    }
}

impl<T> Future for Waiter<T> {
    type Output = Result<T, TerminationCause>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // The registry always resolves the sender before dropping it; a
            // dropped sender without a send means the registry itself was
            // torn down mid-flight.
            Poll::Ready(Err(_)) => Poll::Ready(Err(TerminationCause::Cancelled(
                "registry dropped without resolving this request".into(),
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}
