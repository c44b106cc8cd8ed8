//! # Design
//!
//! - One error per stage: planning, copy execution, and the task engine.
//! - Messages are constant; identifiers travel as context fields.
//! - Backend failures are carried unchanged so callers see what the content
//!   service reported.

use katello_content_core::{ContentError, ContentUnitKind, RepositoryId, UnitId};
use katello_telemetry::TelemetryError;
use thiserror::Error;

use crate::engine::{TaskFailure, TaskId};

/// Result alias for task engine operations.
pub type TaskResult<T> = Result<T, TaskError>;

/// The unit set handed to the builder cannot be described by one descriptor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// Units of more than one kind were supplied.
    #[error("content units must share a single kind")]
    MixedUnitKinds {
        /// Kind of the first unit.
        expected: ContentUnitKind,
        /// Kind of the first unit that differed.
        found: ContentUnitKind,
        /// Identifier of the first unit that differed.
        unit_id: UnitId,
    },
    /// A decoded descriptor listed no units.
    #[error("copy descriptor lists no units")]
    NoUnits,
}

/// Failure while executing a copy descriptor.
#[derive(Debug, Error)]
pub enum CopyUnitsError {
    /// Source or target repository no longer exists.
    #[error("repository not found")]
    RepositoryNotFound {
        /// Identifier that failed to resolve.
        repository_id: RepositoryId,
    },
    /// Repository lookup itself failed.
    #[error("repository lookup failed")]
    RepositoryLookup {
        /// Identifier being resolved.
        repository_id: RepositoryId,
        /// Source lookup error.
        source: ContentError,
    },
    /// The unit store for the descriptor's kind failed.
    #[error("content unit lookup failed")]
    UnitLookup {
        /// Kind being resolved.
        kind: ContentUnitKind,
        /// Source lookup error.
        source: ContentError,
    },
    /// No backend endpoint or client could be obtained.
    #[error("content backend unavailable")]
    BackendUnavailable {
        /// Source locator error.
        source: ContentError,
    },
    /// The backend rejected or failed the copy.
    #[error(transparent)]
    Backend(anyhow::Error),
}

impl CopyUnitsError {
    /// Whether running the same descriptor again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::BackendUnavailable { .. })
    }
}

impl TaskFailure for CopyUnitsError {
    fn retryable(&self) -> bool {
        self.is_retryable()
    }
}

/// Task engine errors.
#[derive(Debug, Error)]
pub enum TaskError {
    /// No handler is registered for the task kind.
    #[error("task kind is not registered")]
    UnknownKind {
        /// Requested kind.
        kind: String,
    },
    /// Task input could not be serialized.
    #[error("failed to encode task input")]
    Encode {
        /// Task kind being scheduled.
        kind: &'static str,
        /// Source serialization error.
        source: serde_json::Error,
    },
    /// Stored task input did not match the handler's input type.
    #[error("failed to decode task input")]
    Decode {
        /// Task kind being dispatched.
        kind: &'static str,
        /// Source deserialization error.
        source: serde_json::Error,
    },
    /// The engine has been shut down.
    #[error("task queue is closed")]
    QueueClosed,
    /// No record exists for the task id.
    #[error("task not found")]
    NotFound {
        /// Requested task id.
        task_id: TaskId,
    },
    /// The builder rejected the task input.
    #[error("task input rejected")]
    Plan {
        /// Source planning error.
        #[from]
        source: PlanError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: TelemetryError,
    },
}

impl TaskError {
    pub(crate) const fn telemetry(operation: &'static str, source: TelemetryError) -> Self {
        Self::Telemetry { operation, source }
    }
}
