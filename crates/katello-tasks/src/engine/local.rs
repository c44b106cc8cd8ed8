//! In-process task engine backed by a bounded queue and a fixed worker pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use katello_config::TaskEngineConfig;
use katello_events::{Event, EventBus};
use katello_telemetry::Metrics;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    AsyncTask, ErasedHandler, HandlerFailure, TaskId, TaskRecord, TaskScheduler, TaskState,
    TypedHandler,
};
use crate::error::{TaskError, TaskResult};

/// Runs registered [`AsyncTask`] handlers on a pool of tokio workers.
///
/// Each scheduled task is dispatched to exactly one worker, which runs its
/// attempts back to back. Retryable failures are attempted again up to
/// `max_attempts` times.
///
/// Workers share the engine state but not the queue sender, so dropping the
/// engine without [`Self::shutdown`] still closes the queue and lets the
/// workers exit once it is drained.
pub struct LocalTaskEngine {
    inner: Arc<EngineInner>,
    sender: RwLock<Option<mpsc::Sender<TaskId>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

struct EngineInner {
    handlers: RwLock<HashMap<&'static str, Arc<dyn ErasedHandler>>>,
    records: RwLock<HashMap<TaskId, TaskRecord>>,
    events: EventBus,
    metrics: Metrics,
    max_attempts: u32,
    retry_delay: Duration,
}

impl LocalTaskEngine {
    /// Start `config.worker_count` workers on the current tokio runtime.
    #[must_use]
    pub fn start(config: &TaskEngineConfig, events: EventBus, metrics: Metrics) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let inner = Arc::new(EngineInner {
            handlers: RwLock::new(HashMap::new()),
            records: RwLock::new(HashMap::new()),
            events,
            metrics,
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay(),
        });

        let receiver = Arc::new(Mutex::new(receiver));
        let workers = (0..config.worker_count.max(1))
            .map(|worker| {
                let inner = Arc::clone(&inner);
                let receiver = Arc::clone(&receiver);
                tokio::spawn(run_worker(worker, inner, receiver))
            })
            .collect();
        info!(
            workers = config.worker_count,
            queue_capacity = config.queue_capacity,
            max_attempts = config.max_attempts,
            "task engine started"
        );

        Self {
            inner,
            sender: RwLock::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    /// Route tasks of kind [`AsyncTask::KIND`] to `task`, replacing any
    /// previous handler for that kind.
    pub async fn register<T: AsyncTask>(&self, task: Arc<T>) {
        self.inner
            .handlers
            .write()
            .await
            .insert(T::KIND, Arc::new(TypedHandler(task)));
        info!(kind = T::KIND, "task handler registered");
    }

    /// Current record of a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if no task has that id.
    pub async fn task(&self, task_id: TaskId) -> TaskResult<TaskRecord> {
        self.inner
            .records
            .read()
            .await
            .get(&task_id)
            .cloned()
            .ok_or(TaskError::NotFound { task_id })
    }

    /// Every known task, oldest first.
    pub async fn tasks(&self) -> Vec<TaskRecord> {
        let mut records: Vec<TaskRecord> =
            self.inner.records.read().await.values().cloned().collect();
        records.sort_by_key(|record| record.created_at);
        records
    }

    /// Stop accepting work, let workers drain the queue, and wait for them.
    pub async fn shutdown(&self) {
        drop(self.sender.write().await.take());
        let workers = std::mem::take(&mut *self.workers.lock().await);
        for handle in workers {
            if let Err(err) = handle.await {
                error!(error = %err, "task worker terminated abnormally");
            }
        }
        info!("task engine stopped");
    }
}

#[async_trait]
impl TaskScheduler for LocalTaskEngine {
    async fn schedule(&self, kind: &str, input: Value) -> TaskResult<TaskId> {
        if !self.inner.handlers.read().await.contains_key(kind) {
            return Err(TaskError::UnknownKind {
                kind: kind.to_string(),
            });
        }

        // Holding the read guard keeps shutdown from closing the queue mid-send.
        let sender_guard = self.sender.read().await;
        let sender = sender_guard.as_ref().ok_or(TaskError::QueueClosed)?;
        let permit = sender.reserve().await.map_err(|_| TaskError::QueueClosed)?;

        let task_id = Uuid::new_v4();
        let now = Utc::now();
        self.inner.records.write().await.insert(
            task_id,
            TaskRecord {
                id: task_id,
                kind: kind.to_string(),
                state: TaskState::Queued,
                attempts: 0,
                input,
                last_error: None,
                created_at: now,
                updated_at: now,
            },
        );
        self.inner.metrics.inc_task_scheduled(kind);
        self.inner.events.publish(Event::TaskScheduled {
            task_id,
            kind: kind.to_string(),
        });
        permit.send(task_id);
        info!(task_id = %task_id, kind, "task scheduled");
        Ok(task_id)
    }
}

async fn run_worker(
    worker: usize,
    inner: Arc<EngineInner>,
    receiver: Arc<Mutex<mpsc::Receiver<TaskId>>>,
) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(task_id) = next else {
            break;
        };
        inner.process(task_id).await;
    }
    info!(worker, "task worker exiting");
}

impl EngineInner {
    async fn process(&self, task_id: TaskId) {
        let Some((kind, input)) = self.claim(task_id).await else {
            warn!(task_id = %task_id, "queued task has no record");
            return;
        };
        let handler = self.handlers.read().await.get(kind.as_str()).cloned();
        let Some(handler) = handler else {
            self.metrics.task_started();
            self.finish_failed(task_id, &kind, "task kind is not registered".to_string())
                .await;
            return;
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.mark_running(task_id, attempt).await;
            self.metrics.task_started();
            self.events.publish(Event::TaskStarted {
                task_id,
                kind: kind.clone(),
                attempt,
            });
            info!(task_id = %task_id, kind = %kind, attempt, "task started");

            match handler.invoke(&input).await {
                Ok(()) => {
                    self.finish_succeeded(task_id, &kind).await;
                    return;
                }
                Err(HandlerFailure { message, retryable }) => {
                    if !retryable || attempt >= self.max_attempts {
                        self.finish_failed(task_id, &kind, message).await;
                        return;
                    }
                    self.events.publish(Event::TaskFailed {
                        task_id,
                        kind: kind.clone(),
                        message: message.clone(),
                        will_retry: true,
                    });
                    warn!(
                        task_id = %task_id,
                        kind = %kind,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %message,
                        "task attempt failed; retrying"
                    );
                    self.metrics.inc_task_retry(&kind);
                    self.update(task_id, |record| {
                        record.state = TaskState::Queued;
                        record.last_error = Some(message);
                    })
                    .await;
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
    }

    async fn claim(&self, task_id: TaskId) -> Option<(String, Value)> {
        self.records
            .read()
            .await
            .get(&task_id)
            .map(|record| (record.kind.clone(), record.input.clone()))
    }

    async fn mark_running(&self, task_id: TaskId, attempt: u32) {
        self.update(task_id, |record| {
            record.state = TaskState::Running;
            record.attempts = attempt;
        })
        .await;
    }

    async fn finish_succeeded(&self, task_id: TaskId, kind: &str) {
        self.update(task_id, |record| record.state = TaskState::Succeeded)
            .await;
        self.metrics.inc_task_finished(kind, "succeeded");
        self.events.publish(Event::TaskSucceeded {
            task_id,
            kind: kind.to_string(),
        });
        info!(task_id = %task_id, kind, "task succeeded");
    }

    async fn finish_failed(&self, task_id: TaskId, kind: &str, message: String) {
        error!(task_id = %task_id, kind, error = %message, "task failed");
        self.events.publish(Event::TaskFailed {
            task_id,
            kind: kind.to_string(),
            message: message.clone(),
            will_retry: false,
        });
        self.update(task_id, |record| {
            record.last_error = Some(message.clone());
            record.state = TaskState::Failed { message };
        })
        .await;
        self.metrics.inc_task_finished(kind, "failed");
    }

    async fn update(&self, task_id: TaskId, apply: impl FnOnce(&mut TaskRecord) + Send) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(&task_id) {
            apply(record);
            record.updated_at = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TaskFailure;
    use std::sync::atomic::{AtomicU32, Ordering};
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("flaky failure")]
    struct Flaky {
        retryable: bool,
    }

    impl TaskFailure for Flaky {
        fn retryable(&self) -> bool {
            self.retryable
        }
    }

    struct FailingTask {
        failures_left: AtomicU32,
        retryable: bool,
        runs: AtomicU32,
    }

    impl FailingTask {
        fn new(failures: u32, retryable: bool) -> Arc<Self> {
            Arc::new(Self {
                failures_left: AtomicU32::new(failures),
                retryable,
                runs: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl AsyncTask for FailingTask {
        const KIND: &'static str = "flaky";
        type Input = u32;
        type Error = Flaky;

        async fn run(&self, _input: u32) -> Result<(), Flaky> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left == 0 {
                return Ok(());
            }
            self.failures_left.store(left - 1, Ordering::SeqCst);
            Err(Flaky {
                retryable: self.retryable,
            })
        }
    }

    fn engine(max_attempts: u32) -> (LocalTaskEngine, EventBus, Metrics) {
        let events = EventBus::new();
        let metrics = Metrics::new().expect("metrics");
        let config = TaskEngineConfig {
            worker_count: 2,
            queue_capacity: 8,
            max_attempts,
            retry_delay_ms: 0,
        };
        let engine = LocalTaskEngine::start(&config, events.clone(), metrics.clone());
        (engine, events, metrics)
    }

    #[tokio::test]
    async fn retryable_failures_are_retried_until_success() {
        let (engine, events, metrics) = engine(3);
        let task = FailingTask::new(2, true);
        engine.register(Arc::clone(&task)).await;

        let id = engine
            .schedule("flaky", Value::from(1))
            .await
            .expect("schedule");
        engine.shutdown().await;

        let record = engine.task(id).await.expect("record");
        assert_eq!(record.state, TaskState::Succeeded);
        assert_eq!(record.attempts, 3);
        assert_eq!(record.last_error.as_deref(), Some("flaky failure"));
        assert_eq!(task.runs.load(Ordering::SeqCst), 3);

        let retries = events
            .backlog_since(0)
            .into_iter()
            .filter(|envelope| {
                matches!(
                    envelope.event,
                    Event::TaskFailed {
                        will_retry: true,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(retries, 2);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.task_queue_depth, 0);
        assert_eq!(snapshot.tasks_running, 0);
    }

    #[tokio::test]
    async fn attempts_stop_at_the_configured_limit() {
        let (engine, _events, _metrics) = engine(2);
        let task = FailingTask::new(5, true);
        engine.register(Arc::clone(&task)).await;

        let id = engine
            .schedule("flaky", Value::from(1))
            .await
            .expect("schedule");
        engine.shutdown().await;

        let record = engine.task(id).await.expect("record");
        assert_eq!(
            record.state,
            TaskState::Failed {
                message: "flaky failure".into()
            }
        );
        assert_eq!(record.attempts, 2);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let (engine, _events, _metrics) = engine(5);
        let task = FailingTask::new(1, false);
        engine.register(Arc::clone(&task)).await;

        let id = engine
            .schedule("flaky", Value::from(1))
            .await
            .expect("schedule");
        engine.shutdown().await;

        assert_eq!(engine.task(id).await.expect("record").attempts, 1);
        assert_eq!(task.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn undecodable_input_fails_without_running_the_handler() {
        let (engine, _events, _metrics) = engine(3);
        let task = FailingTask::new(0, true);
        engine.register(Arc::clone(&task)).await;

        let id = engine
            .schedule("flaky", Value::from("not a number"))
            .await
            .expect("schedule");
        engine.shutdown().await;

        let record = engine.task(id).await.expect("record");
        assert!(matches!(
            record.state,
            TaskState::Failed { ref message } if message.starts_with("failed to decode task input")
        ));
        assert_eq!(record.attempts, 1);
        assert_eq!(task.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_kinds_and_closed_queues_are_rejected() {
        let (engine, events, metrics) = engine(1);
        let err = engine
            .schedule("missing", Value::Null)
            .await
            .expect_err("unknown kind");
        assert!(matches!(err, TaskError::UnknownKind { ref kind } if kind == "missing"));

        engine.register(FailingTask::new(0, false)).await;
        engine.shutdown().await;
        let err = engine
            .schedule("flaky", Value::from(1))
            .await
            .expect_err("closed queue");
        assert!(matches!(err, TaskError::QueueClosed));
        assert!(engine.tasks().await.is_empty());
        assert!(events.backlog_since(0).is_empty());
        assert_eq!(metrics.snapshot().task_queue_depth, 0);
        assert!(
            !metrics
                .render()
                .expect("render")
                .contains("tasks_scheduled_total{kind=\"flaky\"}")
        );
    }

    #[tokio::test]
    async fn dropping_the_engine_stops_its_workers() {
        let (engine, _events, _metrics) = engine(1);
        let task = FailingTask::new(0, false);
        engine.register(Arc::clone(&task)).await;
        let id = engine
            .schedule("flaky", Value::from(1))
            .await
            .expect("schedule");
        let state = Arc::downgrade(&engine.inner);
        drop(engine);

        tokio::time::timeout(Duration::from_secs(5), async {
            while state.strong_count() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("workers released the engine state");
        assert_eq!(task.runs.load(Ordering::SeqCst), 1, "queued task {id} drained");
        assert_eq!(Arc::strong_count(&task), 1);
    }

    #[tokio::test]
    async fn unknown_task_ids_are_not_found() {
        let (engine, _events, _metrics) = engine(1);
        let missing = Uuid::new_v4();
        let err = engine.task(missing).await.expect_err("not found");
        assert!(matches!(err, TaskError::NotFound { task_id } if task_id == missing));
        engine.shutdown().await;
    }
}
