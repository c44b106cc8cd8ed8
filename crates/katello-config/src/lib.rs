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

//! Typed configuration for the task engine, backend endpoints, and logging.
//!
//! Layout: `model.rs` (typed config models), `defaults.rs` (default values),
//! `loader.rs` (YAML file + `KATELLO_*` environment overrides), `validate.rs`
//! (range and consistency checks).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_PATH_ENV, ConfigLoader};
pub use model::{BackendConfig, KatelloConfig, LoggingSettings, SmartProxyConfig, TaskEngineConfig};
