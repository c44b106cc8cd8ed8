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

//! Repository unit-copy task: planning, execution, and the task engine it
//! runs on.
//!
//! Layout: `descriptor.rs` (serialized job input), `builder.rs` (planning and
//! scheduling), `executor.rs` (re-resolution and the backend call),
//! `engine/` (task traits and the in-process engine), `locator.rs`
//! (config-backed backend locator), `bootstrap.rs` (wiring from
//! configuration), `error.rs` (task errors).

pub mod bootstrap;
pub mod builder;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod executor;
pub mod locator;

pub use bootstrap::{Collaborators, TaskRuntime, init_logging};
pub use builder::CopyUnits;
pub use descriptor::CopyJobDescriptor;
pub use engine::{
    AsyncTask, LocalTaskEngine, TaskFailure, TaskId, TaskRecord, TaskScheduler, TaskState,
};
pub use error::{CopyUnitsError, PlanError, TaskError, TaskResult};
pub use executor::CopyUnitsExecutor;
pub use locator::{BackendConnector, StaticBackendLocator};
