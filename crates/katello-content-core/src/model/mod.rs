//! Core content domain types and DTOs shared across the workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Primary key of a content repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryId(pub u64);

/// Primary key of a content unit within its kind's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u64);

/// Primary key of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Closed set of content unit kinds a repository can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentUnitKind {
    /// Binary RPM package.
    Rpm,
    /// Source RPM package.
    Srpm,
    /// Errata advisory.
    Erratum,
    /// Comps package group.
    PackageGroup,
    /// Modularity stream.
    ModuleStream,
    /// Container image manifest.
    DockerManifest,
    /// Container image tag.
    DockerTag,
    /// Generic file.
    File,
    /// Ansible collection artifact.
    AnsibleCollection,
}

impl ContentUnitKind {
    /// Stable label used in logs, metrics, and serialized descriptors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rpm => "rpm",
            Self::Srpm => "srpm",
            Self::Erratum => "erratum",
            Self::PackageGroup => "package_group",
            Self::ModuleStream => "module_stream",
            Self::DockerManifest => "docker_manifest",
            Self::DockerTag => "docker_tag",
            Self::File => "file",
            Self::AnsibleCollection => "ansible_collection",
        }
    }
}

impl fmt::Display for ContentUnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that can be copied between repositories: a kind tag plus an id.
pub trait ContentUnit {
    /// Kind of the unit.
    fn kind(&self) -> ContentUnitKind;
    /// Identifier of the unit within its kind's store.
    fn id(&self) -> UnitId;
}

/// Lightweight reference to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentUnitRef {
    /// Kind of the referenced unit.
    pub kind: ContentUnitKind,
    /// Identifier of the referenced unit.
    pub id: UnitId,
}

impl ContentUnitRef {
    /// Construct a reference from its parts.
    #[must_use]
    pub const fn new(kind: ContentUnitKind, id: UnitId) -> Self {
        Self { kind, id }
    }
}

impl ContentUnit for ContentUnitRef {
    fn kind(&self) -> ContentUnitKind {
        self.kind
    }

    fn id(&self) -> UnitId {
        self.id
    }
}

/// Unit as loaded from a unit store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnitRecord {
    /// Identifier of the unit.
    pub id: UnitId,
    /// Kind of the unit.
    pub kind: ContentUnitKind,
    /// Backend-side identifier (e.g. the Pulp href or unit key).
    pub backend_id: String,
    /// Human-readable name (e.g. `bash-5.2.15-1.el9.x86_64`).
    pub name: String,
}

impl ContentUnit for ContentUnitRecord {
    fn kind(&self) -> ContentUnitKind {
        self.kind
    }

    fn id(&self) -> UnitId {
        self.id
    }
}

/// Result of re-resolving a descriptor unit at execution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolvedUnit {
    /// The unit still exists.
    Present(ContentUnitRecord),
    /// The unit was removed after the task was planned.
    Missing {
        /// Kind of the missing unit.
        kind: ContentUnitKind,
        /// Identifier of the missing unit.
        id: UnitId,
    },
}

impl ResolvedUnit {
    /// Whether the unit still exists.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

impl ContentUnit for ResolvedUnit {
    fn kind(&self) -> ContentUnitKind {
        match self {
            Self::Present(record) => record.kind,
            Self::Missing { kind, .. } => *kind,
        }
    }

    fn id(&self) -> UnitId {
        match self {
            Self::Present(record) => record.id,
            Self::Missing { id, .. } => *id,
        }
    }
}

/// Content repository within a lifecycle environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository identifier.
    pub id: RepositoryId,
    /// Display name.
    pub name: String,
    /// Owning product.
    pub product_id: ProductId,
    /// Lifecycle environment label (e.g. `Library`).
    pub environment: String,
    /// Whether the repository has been promoted beyond its initial environment.
    #[serde(default)]
    pub promoted: bool,
    /// Whether the repository carries Red Hat content.
    #[serde(default)]
    pub redhat: bool,
}

/// Backend endpoint hosting a content service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartProxy {
    /// Proxy name.
    pub name: String,
    /// Base URL of the proxy.
    pub url: String,
}

/// Knobs forwarded to the backend when copying units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CopyOptions {
    /// Pull dependent and child units transitively.
    #[serde(default)]
    pub recursive: bool,
    /// Also resolve and copy the units required by the named units.
    #[serde(default)]
    pub resolve_dependencies: bool,
}
