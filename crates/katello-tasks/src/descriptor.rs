//! Serialized input of a copy-units task.
//!
//! # Design
//! - Holds identifiers only; the executor re-resolves every entity by id.
//! - Fields are private so a descriptor cannot change after planning.
//! - Decoding rejects an empty unit list, so a stored descriptor always
//!   describes at least one unit.

use katello_content_core::{ContentUnitKind, ContentUnitRef, CopyOptions, RepositoryId, UnitId};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// Everything needed to copy a homogeneous set of units between two repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DescriptorFields")]
pub struct CopyJobDescriptor {
    source_repo_id: RepositoryId,
    target_repo_id: RepositoryId,
    unit_class: ContentUnitKind,
    unit_ids: Vec<UnitId>,
    recursive: bool,
    resolve_dependencies: bool,
}

#[derive(Deserialize)]
struct DescriptorFields {
    source_repo_id: RepositoryId,
    target_repo_id: RepositoryId,
    unit_class: ContentUnitKind,
    unit_ids: Vec<UnitId>,
    #[serde(default)]
    recursive: bool,
    #[serde(default)]
    resolve_dependencies: bool,
}

impl TryFrom<DescriptorFields> for CopyJobDescriptor {
    type Error = PlanError;

    fn try_from(fields: DescriptorFields) -> Result<Self, Self::Error> {
        if fields.unit_ids.is_empty() {
            return Err(PlanError::NoUnits);
        }
        Ok(Self {
            source_repo_id: fields.source_repo_id,
            target_repo_id: fields.target_repo_id,
            unit_class: fields.unit_class,
            unit_ids: fields.unit_ids,
            recursive: fields.recursive,
            resolve_dependencies: fields.resolve_dependencies,
        })
    }
}

impl CopyJobDescriptor {
    pub(crate) const fn new(
        source_repo_id: RepositoryId,
        target_repo_id: RepositoryId,
        unit_class: ContentUnitKind,
        unit_ids: Vec<UnitId>,
        options: CopyOptions,
    ) -> Self {
        Self {
            source_repo_id,
            target_repo_id,
            unit_class,
            unit_ids,
            recursive: options.recursive,
            resolve_dependencies: options.resolve_dependencies,
        }
    }

    /// Repository the units are copied from.
    #[must_use]
    pub const fn source_repo_id(&self) -> RepositoryId {
        self.source_repo_id
    }

    /// Repository the units are copied into.
    #[must_use]
    pub const fn target_repo_id(&self) -> RepositoryId {
        self.target_repo_id
    }

    /// Kind shared by every unit.
    #[must_use]
    pub const fn unit_class(&self) -> ContentUnitKind {
        self.unit_class
    }

    /// Unit ids in planning order.
    #[must_use]
    pub fn unit_ids(&self) -> &[UnitId] {
        &self.unit_ids
    }

    /// Units as kind-tagged references, in planning order.
    pub fn unit_refs(&self) -> impl Iterator<Item = ContentUnitRef> + '_ {
        self.unit_ids
            .iter()
            .map(|id| ContentUnitRef::new(self.unit_class, *id))
    }

    /// Whether the backend should pull dependent and child units transitively.
    #[must_use]
    pub const fn recursive(&self) -> bool {
        self.recursive
    }

    /// Whether the backend should also copy units the named units require.
    #[must_use]
    pub const fn resolve_dependencies(&self) -> bool {
        self.resolve_dependencies
    }

    /// Flags forwarded to the backend.
    #[must_use]
    pub const fn options(&self) -> CopyOptions {
        CopyOptions {
            recursive: self.recursive,
            resolve_dependencies: self.resolve_dependencies,
        }
    }
}
