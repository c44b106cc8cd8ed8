//! Event payload types carried across the task pipeline.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifier assigned to each event emitted by the platform.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed task lifecycle events surfaced across the system.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A task was accepted by the engine and queued for execution.
    TaskScheduled {
        /// Identifier assigned to the task.
        task_id: Uuid,
        /// Registered task kind (e.g. `copy_units`).
        kind: String,
    },
    /// A worker picked the task up.
    TaskStarted {
        /// Identifier of the running task.
        task_id: Uuid,
        /// Registered task kind.
        kind: String,
        /// Attempt number, starting at 1.
        attempt: u32,
    },
    /// The task handler returned successfully.
    TaskSucceeded {
        /// Identifier of the finished task.
        task_id: Uuid,
        /// Registered task kind.
        kind: String,
    },
    /// The task handler returned an error.
    TaskFailed {
        /// Identifier of the failed task.
        task_id: Uuid,
        /// Registered task kind.
        kind: String,
        /// Rendered error chain.
        message: String,
        /// Whether the engine queued another attempt.
        will_retry: bool,
    },
    /// Content units were copied between two repositories by the backend.
    UnitsCopied {
        /// Repository the units were copied from.
        source_repo_id: u64,
        /// Repository the units were copied into.
        target_repo_id: u64,
        /// Content unit kind label.
        unit_kind: String,
        /// Number of units handed to the backend.
        unit_count: usize,
    },
}

impl Event {
    /// Machine-friendly discriminator for readers and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TaskScheduled { .. } => "task_scheduled",
            Self::TaskStarted { .. } => "task_started",
            Self::TaskSucceeded { .. } => "task_succeeded",
            Self::TaskFailed { .. } => "task_failed",
            Self::UnitsCopied { .. } => "units_copied",
        }
    }

    /// Task identifier carried by lifecycle events.
    #[must_use]
    pub const fn task_id(&self) -> Option<Uuid> {
        match self {
            Self::TaskScheduled { task_id, .. }
            | Self::TaskStarted { task_id, .. }
            | Self::TaskSucceeded { task_id, .. }
            | Self::TaskFailed { task_id, .. } => Some(*task_id),
            Self::UnitsCopied { .. } => None,
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned to the wrapped event.
    pub id: EventId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event payload.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_maps_lifecycle_variants() {
        let task_id = Uuid::nil();
        assert_event_kind(
            &Event::TaskScheduled {
                task_id,
                kind: "copy_units".into(),
            },
            "task_scheduled",
        );
        assert_event_kind(
            &Event::TaskStarted {
                task_id,
                kind: "copy_units".into(),
                attempt: 1,
            },
            "task_started",
        );
        assert_event_kind(
            &Event::TaskSucceeded {
                task_id,
                kind: "copy_units".into(),
            },
            "task_succeeded",
        );
        assert_event_kind(
            &Event::TaskFailed {
                task_id,
                kind: "copy_units".into(),
                message: "boom".into(),
                will_retry: false,
            },
            "task_failed",
        );
        assert_event_kind(
            &Event::UnitsCopied {
                source_repo_id: 1,
                target_repo_id: 2,
                unit_kind: "rpm".into(),
                unit_count: 3,
            },
            "units_copied",
        );
    }

    #[test]
    fn task_id_is_absent_for_copy_notifications() {
        let copied = Event::UnitsCopied {
            source_repo_id: 1,
            target_repo_id: 2,
            unit_kind: "erratum".into(),
            unit_count: 1,
        };
        assert_eq!(copied.task_id(), None);

        let id = Uuid::new_v4();
        let started = Event::TaskStarted {
            task_id: id,
            kind: "copy_units".into(),
            attempt: 2,
        };
        assert_eq!(started.task_id(), Some(id));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::TaskSucceeded {
            task_id: Uuid::nil(),
            kind: "copy_units".into(),
        };
        let json = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(json["type"], "task_succeeded");
        assert_eq!(json["kind"], "copy_units");
    }

    fn assert_event_kind(event: &Event, expected: &str) {
        assert_eq!(event.kind(), expected);
    }
}
