//! Task engine capabilities.
//!
//! # Design
//! - Work is described by a registered kind plus a JSON input; handlers are
//!   plain values implementing [`AsyncTask`], registered by kind.
//! - Callers depend on [`TaskScheduler`] only, so the engine can be swapped
//!   for a durable one without touching task code.
//! - Handlers classify their own failures through [`TaskFailure`]; the engine
//!   decides whether to retry from that alone.

mod local;

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{TaskError, TaskResult};

pub use local::LocalTaskEngine;

/// Identifier assigned to every scheduled task.
pub type TaskId = Uuid;

/// Accepts work for later execution.
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    /// Queue `input` for the handler registered under `kind`.
    async fn schedule(&self, kind: &str, input: Value) -> TaskResult<TaskId>;
}

/// Classifies a handler failure.
pub trait TaskFailure {
    /// Whether running the same input again may succeed.
    fn retryable(&self) -> bool;
}

/// A unit of work the engine can run.
#[async_trait]
pub trait AsyncTask: Send + Sync + 'static {
    /// Kind the handler is registered under.
    const KIND: &'static str;
    /// Decoded task input.
    type Input: DeserializeOwned + Send + 'static;
    /// Failure reported by [`Self::run`].
    type Error: Error + TaskFailure + Send + Sync + 'static;

    /// Run one attempt.
    async fn run(&self, input: Self::Input) -> Result<(), Self::Error>;
}

/// Lifecycle state of a task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting for a worker.
    Queued,
    /// A worker is running an attempt.
    Running,
    /// The handler returned successfully.
    Succeeded,
    /// The last attempt failed and no retry is pending.
    Failed {
        /// Rendered error chain of the last attempt.
        message: String,
    },
}

impl TaskState {
    /// Whether the task will not run again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }
}

/// Engine-side view of a scheduled task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    /// Task identifier.
    pub id: TaskId,
    /// Registered kind.
    pub kind: String,
    /// Current state.
    pub state: TaskState,
    /// Attempts started so far.
    pub attempts: u32,
    /// Encoded input as scheduled.
    pub input: Value,
    /// Error of the most recent failed attempt.
    pub last_error: Option<String>,
    /// When the task was scheduled.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

pub(crate) struct HandlerFailure {
    pub(crate) message: String,
    pub(crate) retryable: bool,
}

#[async_trait]
pub(crate) trait ErasedHandler: Send + Sync {
    async fn invoke(&self, input: &Value) -> Result<(), HandlerFailure>;
}

pub(crate) struct TypedHandler<T>(pub(crate) Arc<T>);

#[async_trait]
impl<T: AsyncTask> ErasedHandler for TypedHandler<T> {
    async fn invoke(&self, input: &Value) -> Result<(), HandlerFailure> {
        let decoded = serde_json::from_value::<T::Input>(input.clone()).map_err(|source| {
            let err = TaskError::Decode {
                kind: T::KIND,
                source,
            };
            HandlerFailure {
                message: render_error(&err),
                retryable: false,
            }
        })?;
        self.0.run(decoded).await.map_err(|err| HandlerFailure {
            retryable: err.retryable(),
            message: render_error(&err),
        })
    }
}

/// Join an error and its sources with `": "`.
pub(crate) fn render_error(err: &(dyn Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        rendered.push_str(": ");
        rendered.push_str(&inner.to_string());
        source = inner.source();
    }
    rendered
}
