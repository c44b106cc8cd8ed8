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

//! Backend-agnostic content interfaces and DTOs.
//!
//! Layout: `model/` (repositories, content units, smart proxies), `service/`
//! (lookup and backend traits), `authorization.rs` (repository permission
//! predicates), `subscriptions.rs` (subscription allocation helpers).

pub mod authorization;
pub mod error;
pub mod model;
pub mod service;
pub mod subscriptions;

pub use authorization::{ProductPermissions, RepositoryAuthorization};
pub use error::{ContentError, ContentResult};
pub use model::{
    ContentUnit, ContentUnitKind, ContentUnitRecord, ContentUnitRef, CopyOptions, ProductId,
    Repository, RepositoryId, ResolvedUnit, SmartProxy, UnitId,
};
pub use service::{BackendLocator, ContentBackend, RepositoryLookup, UnitStore, UnitStores};
