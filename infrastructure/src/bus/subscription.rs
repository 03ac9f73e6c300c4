//! Typed subscription handle returned by [`MessageBus::subscribe`].

use super::message_bus::MessageBus;
use conductor_domain::{AgentMessage, TypedMessage};
use futures::Stream;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Receiving end of one bus subscription.
///
/// Yields every matching message published after the subscription was
/// created. The stream ends when the bus is closed. Dropping the handle
/// deregisters it from the bus.
pub struct Subscription<T: TypedMessage> {
    id: u64,
    receiver: mpsc::UnboundedReceiver<AgentMessage>,
    bus: Arc<MessageBus>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TypedMessage> Subscription<T> {
    pub(crate) fn new(
        id: u64,
        receiver: mpsc::UnboundedReceiver<AgentMessage>,
        bus: Arc<MessageBus>,
    ) -> Self {
        Self {
            id,
            receiver,
            bus,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next message; `None` once the bus is closed.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            let message = self.receiver.recv().await?;
            if let Some(typed) = T::from_message(message) {
                return Some(typed);
            }
        }
    }

    /// Take an already delivered message without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        while let Ok(message) = self.receiver.try_recv() {
            if let Some(typed) = T::from_message(message) {
                return Some(typed);
            }
        }
        None
    }
}

impl<T: TypedMessage> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        loop {
            match this.receiver.poll_recv(cx) {
                Poll::Ready(Some(message)) => {
                    if let Some(typed) = T::from_message(message) {
                        return Poll::Ready(Some(typed));
                    }
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<T: TypedMessage> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}
