#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Task lifecycle event bus for the Katello workspace.
//!
//! The bus provides a typed event enum, sequential identifiers, and a bounded
//! replay ring that readers poll by last seen id. When the ring is full the
//! oldest events are dropped.
//!
//! Layout: `payloads.rs` (event types), `routing.rs` (the replay bus).

pub mod payloads;
pub mod routing;

pub use payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};
pub use routing::EventBus;
