//! Error types for content lookups and backend resolution.

use std::error::Error;

use thiserror::Error;

use crate::model::{ContentUnitKind, RepositoryId};

/// Primary error type for content operations.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Repository no longer exists.
    #[error("repository not found")]
    RepositoryNotFound {
        /// Missing repository identifier.
        repository_id: RepositoryId,
    },
    /// A unit store failed while loading units.
    #[error("content unit lookup failed")]
    UnitLookup {
        /// Kind of unit being loaded.
        kind: ContentUnitKind,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// No backend endpoint is available to serve the request.
    #[error("content backend unavailable")]
    BackendUnavailable {
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

impl ContentError {
    /// Wrap a unit store failure for the given kind.
    pub fn unit_lookup(
        kind: ContentUnitKind,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::UnitLookup {
            kind,
            source: source.into(),
        }
    }
}

/// Convenience alias for content operation results.
pub type ContentResult<T> = Result<T, ContentError>;
