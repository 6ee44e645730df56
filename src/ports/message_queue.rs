//! MessageQueue port - Transport between event producers and dispatcher workers.
//!
//! The dispatcher only ever sees "push with backpressure, pop with blocking,
//! close, introspect". The in-process bounded buffer is one implementation;
//! remote list or log-broker backends plug in behind the same trait.
//!
//! ## Failure taxonomy
//!
//! | Error | Raised by | Meaning |
//! |-------|-----------|---------|
//! | `Closed` | push, pop | queue closed (pop: closed and drained) |
//! | `Timeout` | push | no capacity freed within the timeout |
//! | `Cancelled` | push, pop | the shutdown signal fired while waiting |
//! | `Unsupported` / `InvalidSettings` | construction | backend cannot be built |

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

use crate::domain::notification::NotificationEvent;

/// Errors returned by queue operations and queue construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,

    #[error("push timed out after {0:?}: queue is full")]
    Timeout(Duration),

    #[error("operation cancelled by shutdown")]
    Cancelled,

    #[error("{backend} queue backend is not implemented")]
    Unsupported { backend: &'static str },

    #[error("invalid {backend} queue settings: {reason}")]
    InvalidSettings {
        backend: &'static str,
        reason: String,
    },
}

/// Receiving side of a shutdown broadcast.
///
/// Wraps a `watch::Receiver<bool>`; the signal fires once the sender
/// publishes `true`. A dropped sender never fires.
#[derive(Debug, Clone)]
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    /// Creates a sender/signal pair that has not fired.
    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self(rx))
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self(rx)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Completes when the signal fires.
    pub async fn cancelled(&self) {
        let mut rx = self.0.clone();
        if rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl From<watch::Receiver<bool>> for ShutdownSignal {
    fn from(rx: watch::Receiver<bool>) -> Self {
        Self(rx)
    }
}

/// Bounded FIFO transport for notification events.
///
/// Implementations must ensure:
/// - FIFO order for a single producer/consumer pair
/// - `close` is idempotent and safe to call concurrently with `push`/`pop`
/// - events pushed before `close` remain poppable until drained
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueue an event, waiting up to `timeout` for free capacity.
    ///
    /// # Errors
    ///
    /// - `Closed` if the queue has been closed
    /// - `Timeout` if capacity never freed in time
    /// - `Cancelled` if `shutdown` fired while waiting
    async fn push(
        &self,
        event: NotificationEvent,
        timeout: Duration,
        shutdown: &ShutdownSignal,
    ) -> Result<(), QueueError>;

    /// Dequeue the next event, waiting until one is available.
    ///
    /// # Errors
    ///
    /// - `Closed` once the queue is closed and drained
    /// - `Cancelled` if `shutdown` fired while waiting
    async fn pop(&self, shutdown: &ShutdownSignal) -> Result<NotificationEvent, QueueError>;

    /// Close the queue. Calling it again is a no-op.
    async fn close(&self) -> Result<(), QueueError>;

    /// Number of buffered events.
    fn len(&self) -> usize;

    /// Configured capacity.
    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
