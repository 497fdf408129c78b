//! FIFO holding queue between the subscriber's receive loop and its reader.

use crate::message::Message;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// Queue of received messages with a blocking, timeout-bounded pop.
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone, Default)]
pub struct HoldingQueue {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    messages: Mutex<VecDeque<Message>>,
    available: Notify,
}

impl HoldingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and wake a waiting reader.
    pub async fn push(&self, message: Message) {
        self.inner.messages.lock().await.push_back(message);
        self.inner.available.notify_one();
    }

    /// Pop the oldest message, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `None` when the timeout elapses with the queue still empty.
    pub async fn pop(&self, timeout: Duration) -> Option<Message> {
        tokio::time::timeout(timeout, self.pop_wait()).await.ok()
    }

    /// Pop the oldest message without waiting.
    pub async fn try_pop(&self) -> Option<Message> {
        self.inner.messages.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.inner.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.messages.lock().await.is_empty()
    }

    async fn pop_wait(&self) -> Message {
        loop {
            if let Some(message) = self.try_pop().await {
                return message;
            }
            // notify_one stores a permit when nobody is waiting, so a push
            // racing with this check is not lost.
            self.inner.available.notified().await;
        }
    }
}
