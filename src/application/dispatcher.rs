//! EventDispatcher - Worker pool that turns queued events into notices.
//!
//! Producers call [`EventDispatcher::dispatch`], which waits a bounded time
//! for queue capacity and never reports failure to the caller. A fixed pool
//! of workers pops events, routes each to the handler registered for its
//! kind and retries failed invocations with a linear backoff.
//!
//! ## Lifecycle
//!
//! | Status | `dispatch` | Workers |
//! |--------|------------|---------|
//! | `Created` | buffered until start | none |
//! | `Running` | accepted | popping and handling |
//! | `Stopping` | dropped | finishing in-flight events |
//! | `Stopped` | dropped | joined, queue closed |
//!
//! ## Failure handling
//!
//! Nothing raised inside a worker escapes it. An event with no handler is
//! dropped. A failing handler is retried up to `RetryPolicy::max_attempts`
//! times, sleeping `attempt x backoff_step` in between, then the event is a
//! terminal loss. A panicking handler is caught once and not retried.
//!
//! Events still buffered when `stop` is called are discarded.

use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use crate::domain::foundation::{DomainError, StateMachine, Timestamp};
use crate::domain::notification::{EventKind, NotificationEvent};
use crate::ports::{EventHandler, MessageQueue, QueueError, ShutdownSignal};

/// Per-event retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total handler invocations allowed for one event (at least 1).
    pub max_attempts: u32,

    /// Backoff unit; the wait after attempt `n` is `n` units.
    pub backoff_step: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_step,
        }
    }

    /// Wait before the attempt following `attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Configuration for the EventDispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Workers launched by [`EventDispatcher::start`].
    pub worker_count: usize,

    /// How long `dispatch` waits for queue capacity.
    pub push_timeout: Duration,

    pub retry: RetryPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_count: 5,
            push_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

impl DispatcherConfig {
    /// Create config with custom worker count.
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Create config with custom push timeout.
    pub fn with_push_timeout(mut self, timeout: Duration) -> Self {
        self.push_timeout = timeout;
        self
    }

    /// Create config with custom retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Lifecycle of a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherStatus {
    Created,
    Running,
    Stopping,
    Stopped,
}

impl DispatcherStatus {
    /// Whether `dispatch` enqueues in this status.
    pub fn accepts_dispatch(&self) -> bool {
        matches!(self, DispatcherStatus::Created | DispatcherStatus::Running)
    }
}

impl StateMachine for DispatcherStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use DispatcherStatus::*;
        matches!(
            (self, target),
            (Created, Running) | (Created, Stopped) | (Running, Stopping) | (Stopping, Stopped)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use DispatcherStatus::*;
        match self {
            Created => vec![Running, Stopped],
            Running => vec![Stopping],
            Stopping => vec![Stopped],
            Stopped => vec![],
        }
    }
}

/// Why a single handler invocation did not succeed.
#[derive(Debug, Error)]
pub enum HandlerFailure {
    #[error("handler failed: {0}")]
    Failed(DomainError),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Point-in-time counters of a dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherMetrics {
    /// Events accepted by the queue.
    pub dispatched: u64,
    /// Events rejected before reaching the queue.
    pub dropped: u64,
    /// Events popped with no registered handler.
    pub unhandled: u64,
    /// Events a handler completed.
    pub succeeded: u64,
    /// Failed attempts followed by another attempt.
    pub retried: u64,
    /// Events dropped after the last attempt failed.
    pub terminal_losses: u64,
    /// Handler invocations that panicked.
    pub panics: u64,
}

#[derive(Default)]
struct Counters {
    dispatched: AtomicU64,
    dropped: AtomicU64,
    unhandled: AtomicU64,
    succeeded: AtomicU64,
    retried: AtomicU64,
    terminal_losses: AtomicU64,
    panics: AtomicU64,
}

impl Counters {
    fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DispatcherMetrics {
        DispatcherMetrics {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            unhandled: self.unhandled.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            terminal_losses: self.terminal_losses.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
        }
    }
}

/// State shared with worker tasks.
struct Shared {
    queue: Arc<dyn MessageQueue>,
    handlers: RwLock<HashMap<EventKind, Arc<dyn EventHandler>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown: ShutdownSignal,
    config: DispatcherConfig,
    counters: Counters,
}

struct Lifecycle {
    status: DispatcherStatus,
    workers: Vec<JoinHandle<()>>,
}

/// Owns the queue, the handler registry and the worker pool.
///
/// # Example
///
/// ```ignore
/// let queue = new_message_queue(&QueueConfig::default())?;
/// let dispatcher = EventDispatcher::new(queue, DispatcherConfig::default());
///
/// dispatcher.register_handler(Arc::new(AwardHandler::new(repo.clone()))).await;
/// dispatcher.start().await?;
///
/// dispatcher.dispatch(event).await;
///
/// dispatcher.stop().await;
/// ```
pub struct EventDispatcher {
    shared: Arc<Shared>,
    lifecycle: RwLock<Lifecycle>,
}

impl EventDispatcher {
    /// Creates a dispatcher over `queue`; no workers run until `start`.
    pub fn new(queue: Arc<dyn MessageQueue>, config: DispatcherConfig) -> Self {
        let (shutdown_tx, shutdown) = ShutdownSignal::channel();
        Self {
            shared: Arc::new(Shared {
                queue,
                handlers: RwLock::new(HashMap::new()),
                shutdown_tx,
                shutdown,
                config,
                counters: Counters::default(),
            }),
            lifecycle: RwLock::new(Lifecycle {
                status: DispatcherStatus::Created,
                workers: Vec::new(),
            }),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.shared.config
    }

    /// Registers `handler` for its kind, replacing any previous one.
    pub async fn register_handler(&self, handler: Arc<dyn EventHandler>) {
        let kind = handler.supported_kind();
        let name = handler.name();
        let previous = self.shared.handlers.write().await.insert(kind, handler);

        match previous {
            Some(old) => tracing::info!(
                event_kind = %kind,
                handler = name,
                replaced = old.name(),
                "Event handler replaced"
            ),
            None => tracing::info!(event_kind = %kind, handler = name, "Event handler registered"),
        }
    }

    pub async fn has_handler(&self, kind: EventKind) -> bool {
        self.shared.handlers.read().await.contains_key(&kind)
    }

    /// Enqueues `event` for the workers.
    ///
    /// Waits up to the configured push timeout for capacity. Rejection,
    /// timeout or a closed queue is logged and the event is dropped.
    pub async fn dispatch(&self, event: NotificationEvent) {
        let status = self.lifecycle.read().await.status;
        let kind = event.kind();
        let account_id = event.account_id();
        let correlation_id = event.metadata().correlation_id.clone();

        if !status.accepts_dispatch() {
            Counters::incr(&self.shared.counters.dropped);
            tracing::warn!(
                event_kind = %kind,
                account_id = %account_id,
                status = ?status,
                "Dispatcher is not accepting events, dropping"
            );
            return;
        }

        let timeout = self.shared.config.push_timeout;
        match self
            .shared
            .queue
            .push(event, timeout, &self.shared.shutdown)
            .await
        {
            Ok(()) => {
                Counters::incr(&self.shared.counters.dispatched);
                tracing::debug!(
                    event_kind = %kind,
                    account_id = %account_id,
                    correlation_id = ?correlation_id,
                    "Event dispatched"
                );
            }
            Err(QueueError::Timeout(waited)) => {
                Counters::incr(&self.shared.counters.dropped);
                tracing::error!(
                    event_kind = %kind,
                    account_id = %account_id,
                    correlation_id = ?correlation_id,
                    waited_ms = waited.as_millis() as u64,
                    queue_len = self.shared.queue.len(),
                    queue_cap = self.shared.queue.capacity(),
                    "Event queue full, dropping event"
                );
            }
            Err(e) => {
                Counters::incr(&self.shared.counters.dropped);
                tracing::warn!(
                    event_kind = %kind,
                    account_id = %account_id,
                    correlation_id = ?correlation_id,
                    error = %e,
                    "Failed to enqueue event, dropping"
                );
            }
        }
    }

    /// Launches the configured number of workers.
    pub async fn start(&self) -> Result<(), DomainError> {
        self.start_with(self.shared.config.worker_count).await
    }

    /// Launches `worker_count` workers.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if `worker_count` is zero
    /// - `InvalidStateTransition` unless the dispatcher was just created
    pub async fn start_with(&self, worker_count: usize) -> Result<(), DomainError> {
        if worker_count == 0 {
            return Err(DomainError::validation(
                "worker_count",
                "At least one worker is required",
            ));
        }

        let mut lifecycle = self.lifecycle.write().await;
        lifecycle.status = lifecycle.status.transition_to(DispatcherStatus::Running)?;

        for worker_id in 0..worker_count {
            let shared = Arc::clone(&self.shared);
            lifecycle
                .workers
                .push(tokio::spawn(async move { shared.run_worker(worker_id).await }));
        }

        tracing::info!(
            worker_count,
            queue_cap = self.shared.queue.capacity(),
            "Event dispatcher started"
        );
        Ok(())
    }

    /// Stops the workers and closes the queue.
    ///
    /// Waits for in-flight events to finish their retry cycle. Only the
    /// first call does anything.
    pub async fn stop(&self) {
        let workers = {
            let mut lifecycle = self.lifecycle.write().await;
            let next = match lifecycle.status {
                DispatcherStatus::Created => DispatcherStatus::Stopped,
                DispatcherStatus::Running => DispatcherStatus::Stopping,
                DispatcherStatus::Stopping | DispatcherStatus::Stopped => return,
            };
            match lifecycle.status.transition_to(next) {
                Ok(status) => lifecycle.status = status,
                Err(e) => {
                    tracing::error!(error = %e, "Unexpected dispatcher state during stop");
                    return;
                }
            }
            std::mem::take(&mut lifecycle.workers)
        };

        tracing::info!(
            workers = workers.len(),
            buffered = self.shared.queue.len(),
            "Stopping event dispatcher"
        );
        self.shared.shutdown_tx.send_replace(true);

        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Dispatcher worker ended abnormally");
            }
        }

        if let Err(e) = self.shared.queue.close().await {
            tracing::error!(error = %e, "Failed to close event queue");
        }

        let mut lifecycle = self.lifecycle.write().await;
        if lifecycle.status == DispatcherStatus::Stopping {
            lifecycle.status = DispatcherStatus::Stopped;
        }
        tracing::info!("Event dispatcher stopped");
    }

    pub async fn status(&self) -> DispatcherStatus {
        self.lifecycle.read().await.status
    }

    /// Number of events waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn queue_capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    pub fn metrics(&self) -> DispatcherMetrics {
        self.shared.counters.snapshot()
    }
}

impl Shared {
    async fn run_worker(&self, worker_id: usize) {
        tracing::debug!(worker_id, "Dispatcher worker started");

        loop {
            let event = match self.queue.pop(&self.shutdown).await {
                Ok(event) => event,
                Err(QueueError::Cancelled) | Err(QueueError::Closed) => break,
                Err(e) => {
                    tracing::error!(worker_id, error = %e, "Queue pop failed, worker exiting");
                    break;
                }
            };
            self.process(worker_id, event).await;
        }

        tracing::debug!(worker_id, "Dispatcher worker stopped");
    }

    async fn process(&self, worker_id: usize, event: NotificationEvent) {
        let kind = event.kind();
        let handler = self.handlers.read().await.get(&kind).cloned();

        let Some(handler) = handler else {
            Counters::incr(&self.counters.unhandled);
            tracing::warn!(
                worker_id,
                event_id = %event.event_id(),
                event_kind = %kind,
                account_id = %event.account_id(),
                "No handler registered for event kind, dropping"
            );
            return;
        };

        let retry = self.config.retry;
        for attempt in 1..=retry.max_attempts {
            match invoke(handler.as_ref(), &event).await {
                Ok(()) => {
                    Counters::incr(&self.counters.succeeded);
                    tracing::debug!(
                        worker_id,
                        event_id = %event.event_id(),
                        event_kind = %kind,
                        account_id = %event.account_id(),
                        handler = handler.name(),
                        attempt,
                        latency_ms = Timestamp::now()
                            .duration_since(&event.occurred_at())
                            .num_milliseconds(),
                        "Event handled"
                    );
                    return;
                }
                Err(HandlerFailure::Panicked(message)) => {
                    Counters::incr(&self.counters.panics);
                    tracing::error!(
                        worker_id,
                        event_id = %event.event_id(),
                        event_kind = %kind,
                        account_id = %event.account_id(),
                        correlation_id = ?event.metadata().correlation_id,
                        handler = handler.name(),
                        attempt,
                        panic = %message,
                        event = ?event.payload(),
                        "Event handler panicked, dropping event"
                    );
                    return;
                }
                Err(HandlerFailure::Failed(error)) if attempt < retry.max_attempts => {
                    Counters::incr(&self.counters.retried);
                    let backoff = retry.backoff_for(attempt);
                    tracing::warn!(
                        worker_id,
                        event_id = %event.event_id(),
                        event_kind = %kind,
                        account_id = %event.account_id(),
                        handler = handler.name(),
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %error,
                        "Event handler failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(HandlerFailure::Failed(error)) => {
                    Counters::incr(&self.counters.terminal_losses);
                    tracing::error!(
                        worker_id,
                        event_id = %event.event_id(),
                        event_kind = %kind,
                        account_id = %event.account_id(),
                        correlation_id = ?event.metadata().correlation_id,
                        handler = handler.name(),
                        attempt,
                        error = %error,
                        event = ?event.payload(),
                        "Event handler failed after final attempt, event lost"
                    );
                }
            }
        }
    }
}

/// Runs one handler invocation, converting a panic into a failure.
async fn invoke(
    handler: &dyn EventHandler,
    event: &NotificationEvent,
) -> Result<(), HandlerFailure> {
    match AssertUnwindSafe(handler.handle(event)).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HandlerFailure::Failed(e)),
        Err(payload) => Err(HandlerFailure::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ChannelQueue;
    use crate::domain::foundation::{AccountId, ErrorCode};
    use crate::domain::notification::{AwardPayload, ManuscriptAuditPayload};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Instant;

    /// Handler double that records call times and fails on demand.
    struct ScriptedHandler {
        kind: EventKind,
        name: &'static str,
        /// Attempts before this one fail; `u32::MAX` fails forever.
        fail_first: u32,
        panic_on: Option<&'static str>,
        calls: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedHandler {
        fn new(kind: EventKind) -> Self {
            Self {
                kind,
                name: "ScriptedHandler",
                fail_first: 0,
                panic_on: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing_first(mut self, attempts: u32) -> Self {
            self.fail_first = attempts;
            self
        }

        fn always_failing(self) -> Self {
            self.failing_first(u32::MAX)
        }

        fn panicking_on(mut self, manuscript_id: &'static str) -> Self {
            self.panic_on = Some(manuscript_id);
            self
        }

        fn named(mut self, name: &'static str) -> Self {
            self.name = name;
            self
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }

        fn calls_for(&self, manuscript_id: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _)| id == manuscript_id)
                .count()
        }
    }

    fn manuscript_id(event: &NotificationEvent) -> String {
        match (event.as_award(), event.as_manuscript_audit()) {
            (Some(award), _) => award.manuscript_id.clone(),
            (_, Some(audit)) => audit.manuscript_id.clone(),
            _ => String::new(),
        }
    }

    #[async_trait]
    impl EventHandler for ScriptedHandler {
        fn supported_kind(&self) -> EventKind {
            self.kind
        }

        async fn handle(&self, event: &NotificationEvent) -> Result<(), DomainError> {
            let id = manuscript_id(event);
            let attempt = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((id.clone(), Instant::now()));
                calls.iter().filter(|(c, _)| *c == id).count() as u32
            };

            if self.panic_on == Some(id.as_str()) {
                panic!("boom on {}", id);
            }
            if attempt <= self.fail_first {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    "Simulated insert failure",
                ));
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    fn award(manuscript_id: &str) -> NotificationEvent {
        NotificationEvent::award(
            AccountId::new(123456),
            AwardPayload::new(manuscript_id, 500, "现金奖励"),
        )
    }

    fn test_config(step_ms: u64) -> DispatcherConfig {
        DispatcherConfig::default()
            .with_worker_count(1)
            .with_push_timeout(Duration::from_millis(50))
            .with_retry(RetryPolicy::new(3, Duration::from_millis(step_ms)))
    }

    fn dispatcher(capacity: usize, config: DispatcherConfig) -> EventDispatcher {
        EventDispatcher::new(Arc::new(ChannelQueue::new(capacity)), config)
    }

    async fn wait_until(dispatcher: &EventDispatcher, done: impl Fn(&DispatcherMetrics) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(&dispatcher.metrics()) {
            assert!(Instant::now() < deadline, "timed out: {:?}", dispatcher.metrics());
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[test]
    fn retry_policy_backoff_is_linear() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
    }

    #[test]
    fn retry_policy_requires_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn config_defaults_match_reference_values() {
        let config = DispatcherConfig::default();
        assert_eq!(config.worker_count, 5);
        assert_eq!(config.push_timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff_step, Duration::from_secs(1));
    }

    #[test]
    fn status_transitions() {
        use DispatcherStatus::*;
        assert!(Created.can_transition_to(&Running));
        assert!(Created.can_transition_to(&Stopped));
        assert!(Running.can_transition_to(&Stopping));
        assert!(Stopping.can_transition_to(&Stopped));
        assert!(!Running.can_transition_to(&Created));
        assert!(!Stopped.can_transition_to(&Running));
        assert!(Stopped.is_terminal());
    }

    #[test]
    fn panic_message_reads_string_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[tokio::test]
    async fn successful_event_is_handled_once() {
        let dispatcher = dispatcher(8, test_config(10));
        let handler = Arc::new(ScriptedHandler::new(EventKind::Award));
        dispatcher.register_handler(handler.clone()).await;
        dispatcher.start().await.unwrap();

        dispatcher.dispatch(award("MS001")).await;
        wait_until(&dispatcher, |m| m.succeeded == 1).await;

        assert_eq!(handler.call_count(), 1);
        assert_eq!(dispatcher.metrics().dispatched, 1);
        assert_eq!(dispatcher.metrics().retried, 0);
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn always_failing_handler_is_invoked_max_attempts_times() {
        let step = Duration::from_millis(20);
        let dispatcher = dispatcher(8, test_config(20));
        let handler = Arc::new(ScriptedHandler::new(EventKind::Award).always_failing());
        dispatcher.register_handler(handler.clone()).await;
        dispatcher.start().await.unwrap();

        dispatcher.dispatch(award("MS001")).await;
        wait_until(&dispatcher, |m| m.terminal_losses == 1).await;

        assert_eq!(handler.call_count(), 3);
        let times = handler.call_times();
        assert!(times[1] - times[0] >= step);
        assert!(times[2] - times[1] >= step * 2);

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.retried, 2);
        assert_eq!(metrics.terminal_losses, 1);
        assert_eq!(metrics.succeeded, 0);

        // Worker survives and keeps consuming
        dispatcher.dispatch(award("MS002")).await;
        wait_until(&dispatcher, |m| m.terminal_losses == 2).await;
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn handler_succeeding_on_retry_stops_retrying() {
        let dispatcher = dispatcher(8, test_config(10));
        let handler = Arc::new(ScriptedHandler::new(EventKind::Award).failing_first(1));
        dispatcher.register_handler(handler.clone()).await;
        dispatcher.start().await.unwrap();

        dispatcher.dispatch(award("MS001")).await;
        wait_until(&dispatcher, |m| m.succeeded == 1).await;

        assert_eq!(handler.call_count(), 2);
        assert_eq!(dispatcher.metrics().retried, 1);
        assert_eq!(dispatcher.metrics().terminal_losses, 0);
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn panicking_handler_is_contained_and_not_retried() {
        let dispatcher = dispatcher(8, test_config(10));
        let handler = Arc::new(ScriptedHandler::new(EventKind::Award).panicking_on("MS-PANIC"));
        dispatcher.register_handler(handler.clone()).await;
        dispatcher.start().await.unwrap();

        dispatcher.dispatch(award("MS-PANIC")).await;
        dispatcher.dispatch(award("MS002")).await;
        wait_until(&dispatcher, |m| m.succeeded == 1).await;

        assert_eq!(handler.calls_for("MS-PANIC"), 1);
        assert_eq!(handler.calls_for("MS002"), 1);
        let metrics = dispatcher.metrics();
        assert_eq!(metrics.panics, 1);
        assert_eq!(metrics.retried, 0);
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn event_without_handler_is_dropped() {
        let dispatcher = dispatcher(8, test_config(10));
        let handler = Arc::new(ScriptedHandler::new(EventKind::Award));
        dispatcher.register_handler(handler.clone()).await;
        dispatcher.start().await.unwrap();

        dispatcher
            .dispatch(NotificationEvent::manuscript_audit(
                AccountId::new(1),
                ManuscriptAuditPayload::new("MS001", 1, 2),
            ))
            .await;
        dispatcher.dispatch(award("MS002")).await;
        wait_until(&dispatcher, |m| m.unhandled == 1 && m.succeeded == 1).await;

        assert_eq!(handler.call_count(), 1);
        assert_eq!(dispatcher.metrics().retried, 0);
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let dispatcher = dispatcher(8, test_config(10));
        let first = Arc::new(ScriptedHandler::new(EventKind::Award).named("First"));
        let second = Arc::new(ScriptedHandler::new(EventKind::Award).named("Second"));
        dispatcher.register_handler(first.clone()).await;
        dispatcher.register_handler(second.clone()).await;
        dispatcher.start().await.unwrap();

        dispatcher.dispatch(award("MS001")).await;
        wait_until(&dispatcher, |m| m.succeeded == 1).await;

        assert_eq!(first.call_count(), 0);
        assert_eq!(second.call_count(), 1);
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn stop_waits_for_in_flight_retries() {
        let dispatcher = dispatcher(8, test_config(50));
        let handler = Arc::new(ScriptedHandler::new(EventKind::Award).always_failing());
        dispatcher.register_handler(handler.clone()).await;
        dispatcher.start().await.unwrap();

        dispatcher.dispatch(award("MS001")).await;
        while handler.call_count() == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        dispatcher.stop().await;

        assert_eq!(handler.call_count(), 3);
        assert_eq!(dispatcher.metrics().terminal_losses, 1);
        assert_eq!(dispatcher.status().await, DispatcherStatus::Stopped);
    }

    #[tokio::test]
    async fn events_dispatched_before_start_are_buffered() {
        let dispatcher = dispatcher(8, test_config(10));
        let handler = Arc::new(ScriptedHandler::new(EventKind::Award));
        dispatcher.register_handler(handler.clone()).await;

        dispatcher.dispatch(award("MS001")).await;
        assert_eq!(dispatcher.queue_len(), 1);
        assert_eq!(handler.call_count(), 0);

        dispatcher.start().await.unwrap();
        wait_until(&dispatcher, |m| m.succeeded == 1).await;
        assert_eq!(dispatcher.queue_len(), 0);
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn full_queue_drops_after_push_timeout() {
        let dispatcher = dispatcher(1, test_config(10));

        dispatcher.dispatch(award("MS001")).await;
        let started = Instant::now();
        dispatcher.dispatch(award("MS002")).await;

        assert!(started.elapsed() >= Duration::from_millis(50));
        let metrics = dispatcher.metrics();
        assert_eq!(metrics.dispatched, 1);
        assert_eq!(metrics.dropped, 1);
        assert_eq!(dispatcher.queue_len(), 1);
        assert_eq!(dispatcher.queue_capacity(), 1);
    }

    #[tokio::test]
    async fn dispatch_after_stop_is_dropped() {
        let dispatcher = dispatcher(8, test_config(10));
        dispatcher.start().await.unwrap();
        dispatcher.stop().await;

        dispatcher.dispatch(award("MS001")).await;

        assert_eq!(dispatcher.metrics().dropped, 1);
        assert_eq!(dispatcher.metrics().dispatched, 0);
    }

    #[tokio::test]
    async fn stop_discards_buffered_events() {
        let dispatcher = dispatcher(8, test_config(10));
        let handler = Arc::new(ScriptedHandler::new(EventKind::Award));
        dispatcher.register_handler(handler.clone()).await;

        dispatcher.dispatch(award("MS001")).await;
        dispatcher.dispatch(award("MS002")).await;
        dispatcher.stop().await;

        assert_eq!(handler.call_count(), 0);
        assert_eq!(dispatcher.status().await, DispatcherStatus::Stopped);
        assert!(dispatcher.start().await.is_err());
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let dispatcher = dispatcher(8, test_config(10));
        dispatcher.start().await.unwrap();

        let err = dispatcher.start().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn start_with_zero_workers_is_rejected() {
        let dispatcher = dispatcher(8, test_config(10));
        let err = dispatcher.start_with(0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(dispatcher.status().await, DispatcherStatus::Created);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let dispatcher = dispatcher(8, test_config(10));
        dispatcher.start().await.unwrap();

        dispatcher.stop().await;
        dispatcher.stop().await;

        assert_eq!(dispatcher.status().await, DispatcherStatus::Stopped);
    }

    #[tokio::test]
    async fn many_workers_share_the_queue() {
        let dispatcher = dispatcher(64, test_config(10).with_worker_count(4));
        let handler = Arc::new(ScriptedHandler::new(EventKind::Award));
        dispatcher.register_handler(handler.clone()).await;
        dispatcher.start().await.unwrap();

        for i in 0..20 {
            dispatcher.dispatch(award(&format!("MS{i:03}"))).await;
        }
        wait_until(&dispatcher, |m| m.succeeded == 20).await;

        assert_eq!(handler.call_count(), 20);
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn has_handler_reflects_registry() {
        let dispatcher = dispatcher(8, test_config(10));
        assert!(!dispatcher.has_handler(EventKind::Award).await);

        dispatcher
            .register_handler(Arc::new(ScriptedHandler::new(EventKind::Award)))
            .await;

        assert!(dispatcher.has_handler(EventKind::Award).await);
        assert!(!dispatcher.has_handler(EventKind::ManuscriptAudit).await);
    }
}
