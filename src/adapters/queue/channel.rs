//! Bounded in-memory queue backed by a tokio mpsc channel.
//!
//! Producers wait on a send permit for backpressure, consumers share the
//! receiver behind an async mutex. Closing drops the queue's own sender and
//! flips a watch flag so blocked pushers fail immediately; the receiver keeps
//! yielding buffered events until the buffer drains.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex, RwLock};

use crate::domain::notification::NotificationEvent;
use crate::ports::{MessageQueue, QueueError, ShutdownSignal};

/// In-process bounded FIFO queue.
///
/// # Example
///
/// ```ignore
/// let queue = ChannelQueue::new(1000);
/// queue.push(event, Duration::from_secs(5), &ShutdownSignal::never()).await?;
/// let next = queue.pop(&shutdown).await?;
/// ```
pub struct ChannelQueue {
    sender: RwLock<Option<mpsc::Sender<NotificationEvent>>>,
    receiver: Mutex<mpsc::Receiver<NotificationEvent>>,
    closed: watch::Sender<bool>,
    buffered: AtomicUsize,
    capacity: usize,
}

impl ChannelQueue {
    /// Creates an open queue holding at most `capacity` events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let (closed, _) = watch::channel(false);
        Self {
            sender: RwLock::new(Some(tx)),
            receiver: Mutex::new(rx),
            closed,
            buffered: AtomicUsize::new(0),
            capacity,
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[async_trait]
impl MessageQueue for ChannelQueue {
    async fn push(
        &self,
        event: NotificationEvent,
        timeout: Duration,
        shutdown: &ShutdownSignal,
    ) -> Result<(), QueueError> {
        // Clone so the lock is not held while waiting for capacity
        let sender = match self.sender.read().await.as_ref() {
            Some(sender) => sender.clone(),
            None => return Err(QueueError::Closed),
        };
        let mut closed = self.closed.subscribe();

        tokio::select! {
            biased;

            _ = closed.wait_for(|c| *c) => Err(QueueError::Closed),

            _ = shutdown.cancelled() => Err(QueueError::Cancelled),

            reserved = tokio::time::timeout(timeout, sender.reserve()) => match reserved {
                Ok(Ok(permit)) => {
                    self.buffered.fetch_add(1, Ordering::SeqCst);
                    permit.send(event);
                    Ok(())
                }
                Ok(Err(_)) => Err(QueueError::Closed),
                Err(_) => Err(QueueError::Timeout(timeout)),
            },
        }
    }

    async fn pop(&self, shutdown: &ShutdownSignal) -> Result<NotificationEvent, QueueError> {
        let mut receiver = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(QueueError::Cancelled),
            guard = self.receiver.lock() => guard,
        };

        // Cancellation wins over buffered events so stop does not drain the queue
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(QueueError::Cancelled),
            received = receiver.recv() => match received {
                Some(event) => {
                    self.buffered.fetch_sub(1, Ordering::SeqCst);
                    Ok(event)
                }
                None => Err(QueueError::Closed),
            },
        }
    }

    async fn close(&self) -> Result<(), QueueError> {
        self.closed.send_replace(true);
        self.sender.write().await.take();
        Ok(())
    }

    fn len(&self) -> usize {
        self.buffered.load(Ordering::SeqCst)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
