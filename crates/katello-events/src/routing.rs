//! Event bus routing helpers.

use crate::payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared, bounded log of task lifecycle events.
///
/// Events get sequential ids and are kept in a ring of `replay_capacity`
/// entries; readers poll with [`EventBus::backlog_since`].
#[derive(Clone)]
pub struct EventBus {
    replay: Arc<Mutex<Ring>>,
    replay_capacity: usize,
}

struct Ring {
    next_id: EventId,
    events: VecDeque<EventEnvelope>,
}

impl EventBus {
    /// Construct a bus with a custom replay capacity.
    ///
    /// # Panics
    ///
    /// Panics if `replay_capacity` is zero.
    #[must_use]
    pub fn with_capacity(replay_capacity: usize) -> Self {
        assert!(replay_capacity > 0, "event bus capacity must be positive");
        Self {
            replay: Arc::new(Mutex::new(Ring {
                next_id: 1,
                events: VecDeque::with_capacity(replay_capacity),
            })),
            replay_capacity,
        }
    }

    /// Construct a bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Record a new event and return the assigned id.
    pub fn publish(&self, event: Event) -> EventId {
        // Ids are assigned under the ring lock so the ring stays ordered.
        let mut ring = self.lock_replay();
        let id = ring.next_id;
        ring.next_id = id.saturating_add(1);
        if ring.events.len() == self.replay_capacity {
            let _ = ring.events.pop_front();
        }
        ring.events.push_back(EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        });
        id
    }

    /// Collect a backlog of events emitted after the specified id.
    #[must_use]
    pub fn backlog_since(&self, id: EventId) -> Vec<EventEnvelope> {
        let ring = self.lock_replay();
        ring.events
            .iter()
            .filter(|env| env.id > id)
            .cloned()
            .collect()
    }

    fn lock_replay(&self) -> MutexGuard<'_, Ring> {
        self.replay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
