//! Stream adapter over a subscription.

use crate::error::{Error, Result};
use crate::subscription::{Observer, Subscription};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// A stream of the values pushed by a background follow.
///
/// Yields `Err` once if the follow fails, then ends. Dropping the stream
/// disposes the subscription.
pub struct LogStream<T> {
    receiver: mpsc::UnboundedReceiver<Result<T>>,
    subscription: Subscription,
}

impl<T> LogStream<T> {
    pub(crate) fn new(
        receiver: mpsc::UnboundedReceiver<Result<T>>,
        subscription: Subscription,
    ) -> Self {
        Self {
            receiver,
            subscription,
        }
    }

    /// Handle to stop the follow without dropping the stream.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Check if the sending side has gone away
    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}

impl<T> Unpin for LogStream<T> {}

impl<T> Drop for LogStream<T> {
    fn drop(&mut self) {
        self.subscription.dispose();
    }
}

impl<T> Stream for LogStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Observer forwarding every notification into a channel.
pub(crate) struct ChannelObserver<T> {
    tx: mpsc::UnboundedSender<Result<T>>,
}

impl<T> ChannelObserver<T> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Result<T>>) -> Self {
        Self { tx }
    }
}

impl<T: Send> Observer<T> for ChannelObserver<T> {
    fn on_next(&mut self, value: T) {
        let _ = self.tx.send(Ok(value));
    }

    fn on_error(&mut self, error: Error) {
        let _ = self.tx.send(Err(error));
    }
}
